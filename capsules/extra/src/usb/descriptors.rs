// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Platform-independent USB 2.0 and DFU 1.1 descriptor types.
//!
//! Descriptors are kept as structs and serialized into the reply buffer when
//! the host asks for them, so nothing here is mutated at runtime.

use core::cell::Cell;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DescriptorType {
    Device = 1,
    Configuration,
    String,
    Interface,
    Endpoint,
    DeviceQualifier,
    OtherSpeedConfiguration,
    InterfacePower,
    DfuFunctional = 0x21,
}

impl DescriptorType {
    pub fn from_u8(byte: u8) -> Option<DescriptorType> {
        match byte {
            1 => Some(DescriptorType::Device),
            2 => Some(DescriptorType::Configuration),
            3 => Some(DescriptorType::String),
            4 => Some(DescriptorType::Interface),
            5 => Some(DescriptorType::Endpoint),
            6 => Some(DescriptorType::DeviceQualifier),
            7 => Some(DescriptorType::OtherSpeedConfiguration),
            8 => Some(DescriptorType::InterfacePower),
            0x21 => Some(DescriptorType::DfuFunctional),
            _ => None,
        }
    }
}

pub trait Descriptor {
    /// Serialized size of Descriptor
    fn size(&self) -> usize;

    /// Serialize the descriptor to a buffer for transmission on the bus
    fn write_to(&self, buf: &[Cell<u8>]) -> usize {
        if self.size() > buf.len() {
            0
        } else {
            self.write_to_unchecked(buf)
        }
    }

    /// Same as `write_to()`, but doesn't check that `buf` is long enough
    /// before indexing into it.  This should be used only if the result
    /// of `size()` is first consulted.
    fn write_to_unchecked(&self, buf: &[Cell<u8>]) -> usize;
}

pub struct DeviceDescriptor {
    /// Valid values include 0x0100 (USB1.0), 0x0110 (USB1.1) and 0x0200 (USB2.0)
    pub usb_release: u16,

    /// 0x00 means each interface defines its own class.
    /// 0xFF means the class behavior is defined by the vendor.
    /// All other values have meaning assigned by USB-IF
    pub class: u8,

    pub subclass: u8,

    pub protocol: u8,

    /// Max packet size for endpoint 0.  Must be 8, 16, 32 or 64
    pub max_packet_size_ep0: u8,

    pub vendor_id: u16,

    /// Together with `vendor_id`, this must be unique to the product
    pub product_id: u16,

    /// Device release number in binary coded decimal (BCD)
    pub device_release: u16,

    /// Index of the string descriptor describing manufacturer, or 0 if none
    pub manufacturer_string: u8,

    /// Index of the string descriptor describing product, or 0 if none
    pub product_string: u8,

    /// Index of the string descriptor giving device serial number, or 0 if none
    pub serial_number_string: u8,

    /// Number of configurations the device supports.  Must be at least one
    pub num_configurations: u8,
}

impl Default for DeviceDescriptor {
    fn default() -> Self {
        DeviceDescriptor {
            usb_release: 0x0200,
            class: 0,
            subclass: 0,
            protocol: 0,
            max_packet_size_ep0: 64,
            vendor_id: 0x6667,
            product_id: 0xabcd,
            device_release: 0x0001,
            manufacturer_string: 0,
            product_string: 0,
            serial_number_string: 0,
            num_configurations: 1,
        }
    }
}

impl Descriptor for DeviceDescriptor {
    fn size(&self) -> usize {
        18
    }

    fn write_to_unchecked(&self, buf: &[Cell<u8>]) -> usize {
        buf[0].set(18); // Size of descriptor
        buf[1].set(DescriptorType::Device as u8);
        put_u16(&buf[2..4], self.usb_release);
        buf[4].set(self.class);
        buf[5].set(self.subclass);
        buf[6].set(self.protocol);
        buf[7].set(self.max_packet_size_ep0);
        put_u16(&buf[8..10], self.vendor_id);
        put_u16(&buf[10..12], self.product_id);
        put_u16(&buf[12..14], self.device_release);
        buf[14].set(self.manufacturer_string);
        buf[15].set(self.product_string);
        buf[16].set(self.serial_number_string);
        buf[17].set(self.num_configurations);
        18
    }
}

pub struct ConfigurationDescriptor {
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub string_index: u8,
    pub attributes: ConfigurationAttributes,
    pub max_power: u8, // in 2mA units
    pub related_descriptor_length: usize,
}

impl Default for ConfigurationDescriptor {
    fn default() -> Self {
        ConfigurationDescriptor {
            num_interfaces: 1,
            configuration_value: 1,
            string_index: 0,
            attributes: ConfigurationAttributes::new(false, false),
            max_power: 50, // in 2mA units
            related_descriptor_length: 0,
        }
    }
}

impl Descriptor for ConfigurationDescriptor {
    fn size(&self) -> usize {
        9
    }

    fn write_to_unchecked(&self, buf: &[Cell<u8>]) -> usize {
        buf[0].set(9); // Size of descriptor
        buf[1].set(DescriptorType::Configuration as u8);
        put_u16(&buf[2..4], (9 + self.related_descriptor_length) as u16);
        buf[4].set(self.num_interfaces);
        buf[5].set(self.configuration_value);
        buf[6].set(self.string_index);
        buf[7].set(From::from(self.attributes));
        buf[8].set(self.max_power);
        9
    }
}

#[derive(Copy, Clone)]
pub struct ConfigurationAttributes(u8);

impl ConfigurationAttributes {
    pub fn new(is_self_powered: bool, supports_remote_wakeup: bool) -> Self {
        ConfigurationAttributes(
            (1 << 7)
                | if is_self_powered { 1 << 6 } else { 0 }
                | if supports_remote_wakeup { 1 << 5 } else { 0 },
        )
    }
}

impl From<ConfigurationAttributes> for u8 {
    fn from(ca: ConfigurationAttributes) -> u8 {
        ca.0
    }
}

pub struct InterfaceDescriptor {
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub string_index: u8,
}

impl Default for InterfaceDescriptor {
    fn default() -> Self {
        // Application specific class, DFU subclass, DFU mode protocol
        InterfaceDescriptor {
            interface_number: 0,
            alternate_setting: 0,
            num_endpoints: 0, // (exluding default control endpoint)
            interface_class: 0xfe,
            interface_subclass: 0x01,
            interface_protocol: 0x02,
            string_index: 0,
        }
    }
}

impl Descriptor for InterfaceDescriptor {
    fn size(&self) -> usize {
        9
    }

    fn write_to_unchecked(&self, buf: &[Cell<u8>]) -> usize {
        buf[0].set(9); // Size of descriptor
        buf[1].set(DescriptorType::Interface as u8);
        buf[2].set(self.interface_number);
        buf[3].set(self.alternate_setting);
        buf[4].set(self.num_endpoints);
        buf[5].set(self.interface_class);
        buf[6].set(self.interface_subclass);
        buf[7].set(self.interface_protocol);
        buf[8].set(self.string_index);
        9
    }
}

/// `bmAttributes` of the DFU functional descriptor.
#[derive(Copy, Clone)]
pub struct DfuAttributes(u8);

impl DfuAttributes {
    pub fn new(
        can_download: bool,
        can_upload: bool,
        manifestation_tolerant: bool,
        will_detach: bool,
    ) -> Self {
        DfuAttributes(
            u8::from(can_download)
                | u8::from(can_upload) << 1
                | u8::from(manifestation_tolerant) << 2
                | u8::from(will_detach) << 3,
        )
    }
}

impl From<DfuAttributes> for u8 {
    fn from(attributes: DfuAttributes) -> u8 {
        attributes.0
    }
}

/// DFU functional descriptor (DFU 1.1, section 4.1.3), placed right after the
/// DFU interface descriptor.
pub struct DfuFunctionalDescriptor {
    pub attributes: DfuAttributes,
    /// Milliseconds the device waits for a bus reset after DFU_DETACH
    pub detach_timeout: u16,
    /// Largest block the device accepts per DFU_DNLOAD / DFU_UPLOAD
    pub transfer_size: u16,
    pub dfu_version: u16,
}

impl Descriptor for DfuFunctionalDescriptor {
    fn size(&self) -> usize {
        9
    }

    fn write_to_unchecked(&self, buf: &[Cell<u8>]) -> usize {
        buf[0].set(9);
        buf[1].set(DescriptorType::DfuFunctional as u8);
        buf[2].set(From::from(self.attributes));
        put_u16(&buf[3..5], self.detach_timeout);
        put_u16(&buf[5..7], self.transfer_size);
        put_u16(&buf[7..9], self.dfu_version);
        9
    }
}

pub struct LanguagesDescriptor<'a> {
    pub langs: &'a [u16],
}

impl Descriptor for LanguagesDescriptor<'_> {
    fn size(&self) -> usize {
        2 + (2 * self.langs.len())
    }

    fn write_to_unchecked(&self, buf: &[Cell<u8>]) -> usize {
        let len = self.size();
        buf[0].set(len as u8);
        buf[1].set(DescriptorType::String as u8);
        for (i, lang) in self.langs.iter().enumerate() {
            put_u16(&buf[2 + (2 * i)..4 + (2 * i)], *lang);
        }
        len
    }
}

pub struct StringDescriptor<'a> {
    pub string: &'a str,
}

impl Descriptor for StringDescriptor<'_> {
    fn size(&self) -> usize {
        2 + 2 * self.string.encode_utf16().count()
    }

    // Encode as utf16-le
    fn write_to_unchecked(&self, buf: &[Cell<u8>]) -> usize {
        let len = self.size();
        buf[0].set(len as u8);
        buf[1].set(DescriptorType::String as u8);
        for (i, unit) in self.string.encode_utf16().enumerate() {
            put_u16(&buf[2 + (2 * i)..4 + (2 * i)], unit);
        }
        len
    }
}

/// Every descriptor the device reports.
///
/// The single configuration is reported as the configuration descriptor
/// followed by the DFU interface descriptor and the DFU functional
/// descriptor. String index 0 is the language list, index `n > 0` is
/// `strings[n - 1]`.
pub struct DescriptorCatalog<'a> {
    device: DeviceDescriptor,
    configuration: ConfigurationDescriptor,
    interface: InterfaceDescriptor,
    functional: DfuFunctionalDescriptor,
    languages: &'a [u16],
    strings: &'a [&'a str],
}

impl<'a> DescriptorCatalog<'a> {
    pub fn new(
        device: DeviceDescriptor,
        mut configuration: ConfigurationDescriptor,
        interface: InterfaceDescriptor,
        functional: DfuFunctionalDescriptor,
        languages: &'a [u16],
        strings: &'a [&'a str],
    ) -> Self {
        configuration.num_interfaces = 1;
        configuration.related_descriptor_length = interface.size() + functional.size();
        DescriptorCatalog {
            device,
            configuration,
            interface,
            functional,
            languages,
            strings,
        }
    }

    pub fn configuration_value(&self) -> u8 {
        self.configuration.configuration_value
    }

    pub fn write_device(&self, buf: &[Cell<u8>]) -> usize {
        self.device.write_to(buf)
    }

    /// Write the configuration blob, returning its total length, or 0 if
    /// `buf` cannot hold it.
    pub fn write_configuration(&self, buf: &[Cell<u8>]) -> usize {
        let total = self.configuration.size() + self.configuration.related_descriptor_length;
        if total > buf.len() {
            return 0;
        }
        let mut len = self.configuration.write_to_unchecked(buf);
        len += self.interface.write_to_unchecked(&buf[len..]);
        len += self.functional.write_to_unchecked(&buf[len..]);
        len
    }

    /// Write string descriptor `index`. `None` if there is no such string.
    pub fn write_string(&self, index: u8, buf: &[Cell<u8>]) -> Option<usize> {
        match index {
            0 => Some(
                LanguagesDescriptor {
                    langs: self.languages,
                }
                .write_to(buf),
            ),
            i => self
                .strings
                .get(i as usize - 1)
                .map(|&string| StringDescriptor { string }.write_to(buf)),
        }
    }
}

static LANGUAGES: &[u16; 1] = &[
    0x0409, // English (United States)
];

static STRINGS: &[&str; 4] = &[
    "Labitat",      // Manufacturer
    "GD32VF103",    // Product
    "000000000001", // Serial number
    "GeckoBoot",    // DFU interface
];

impl DescriptorCatalog<'static> {
    /// Descriptors of the GeckoBoot DFU bootloader.
    pub fn dfu_bootloader(transfer_size: u16) -> Self {
        DescriptorCatalog::new(
            DeviceDescriptor {
                vendor_id: 0x1d50,
                product_id: 0x613e,
                device_release: 0x0200,
                manufacturer_string: 1,
                product_string: 2,
                serial_number_string: 3,
                ..Default::default()
            },
            ConfigurationDescriptor {
                max_power: 250,
                ..Default::default()
            },
            InterfaceDescriptor {
                string_index: 4,
                ..Default::default()
            },
            DfuFunctionalDescriptor {
                attributes: DfuAttributes::new(true, true, true, true),
                detach_timeout: 500,
                transfer_size,
                dfu_version: 0x0101,
            },
            LANGUAGES,
            STRINGS,
        )
    }
}

pub fn put_u16(buf: &[Cell<u8>], n: u16) {
    let [lo, hi] = n.to_le_bytes();
    buf[0].set(lo);
    buf[1].set(hi);
}
