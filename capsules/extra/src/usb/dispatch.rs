// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Table mapping control requests to the handler that answers them.
//!
//! Request codes alone are ambiguous (a class request to interface 0 and a
//! standard request to an endpoint can share bit patterns), so each rule also
//! constrains the interface index and the declared data-stage length. Rules
//! are tried in order and the first one that matches wins. A rule whose code
//! and index match but whose length does not is skipped, and the scan goes on.

use kernel::hil::usb::SetupData;
use kernel::hil::usb_dfu::{
    DFU_ABORT, DFU_CLRSTATUS, DFU_DETACH, DFU_DNLOAD, DFU_GETSTATE, DFU_GETSTATUS, DFU_UPLOAD,
};

use super::dfu::DfuRequest;

/// The DFU interface number.
pub const DFU_INTERFACE: u8 = 0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Request {
    GetStatus,
    SetAddress,
    GetDescriptor,
    GetConfiguration,
    SetConfiguration,
    ClearFeatureEndpoint,
    SetInterface,
    Dfu(DfuRequest),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Match<T> {
    Any,
    Exactly(T),
}

impl<T: PartialEq> Match<T> {
    fn accepts(&self, value: T) -> bool {
        match self {
            Match::Any => true,
            Match::Exactly(expected) => *expected == value,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DispatchRule {
    /// `(bRequest << 8) | bmRequestType`
    pub code: u16,
    /// Compared against the low byte of `wIndex`
    pub interface: Match<u8>,
    pub length: Match<u16>,
    pub request: Request,
}

impl DispatchRule {
    const fn new(code: u16, interface: Match<u8>, length: Match<u16>, request: Request) -> Self {
        DispatchRule {
            code,
            interface,
            length,
            request,
        }
    }

    pub fn matches(&self, setup: &SetupData) -> bool {
        self.code == setup.request()
            && self.interface.accepts(setup.index as u8)
            && self.length.accepts(setup.length)
    }
}

use Match::{Any, Exactly};

/// bmRequestType of a class request to an interface, host to device.
const CLASS_OUT: u8 = 0x21;
/// bmRequestType of a class request to an interface, device to host.
const CLASS_IN: u8 = 0xa1;

const fn code(request_type: u8, request: u8) -> u16 {
    ((request as u16) << 8) | request_type as u16
}

#[rustfmt::skip]
pub static RULES: [DispatchRule; 14] = [
    DispatchRule::new(0x0080, Exactly(0), Any, Request::GetStatus),
    DispatchRule::new(0x0500, Exactly(0), Exactly(0), Request::SetAddress),
    DispatchRule::new(0x0680, Any, Any, Request::GetDescriptor),
    DispatchRule::new(0x0880, Exactly(0), Any, Request::GetConfiguration),
    DispatchRule::new(0x0900, Exactly(0), Exactly(0), Request::SetConfiguration),
    DispatchRule::new(0x0102, Exactly(0), Exactly(0), Request::ClearFeatureEndpoint),
    DispatchRule::new(0x0b01, Exactly(DFU_INTERFACE), Exactly(0), Request::SetInterface),
    DispatchRule::new(code(CLASS_OUT, DFU_DETACH), Exactly(DFU_INTERFACE), Exactly(0), Request::Dfu(DfuRequest::Detach)),
    DispatchRule::new(code(CLASS_OUT, DFU_DNLOAD), Exactly(DFU_INTERFACE), Any, Request::Dfu(DfuRequest::Download)),
    DispatchRule::new(code(CLASS_IN, DFU_UPLOAD), Exactly(DFU_INTERFACE), Any, Request::Dfu(DfuRequest::Upload)),
    DispatchRule::new(code(CLASS_IN, DFU_GETSTATUS), Exactly(DFU_INTERFACE), Any, Request::Dfu(DfuRequest::GetStatus)),
    DispatchRule::new(code(CLASS_OUT, DFU_CLRSTATUS), Exactly(DFU_INTERFACE), Exactly(0), Request::Dfu(DfuRequest::ClearStatus)),
    DispatchRule::new(code(CLASS_IN, DFU_GETSTATE), Exactly(DFU_INTERFACE), Any, Request::Dfu(DfuRequest::GetState)),
    DispatchRule::new(code(CLASS_OUT, DFU_ABORT), Exactly(DFU_INTERFACE), Exactly(0), Request::Dfu(DfuRequest::Abort)),
];

/// First rule of `rules` matching `setup`.
pub fn resolve_in(rules: &[DispatchRule], setup: &SetupData) -> Option<Request> {
    rules
        .iter()
        .find(|rule| rule.matches(setup))
        .map(|rule| rule.request)
}

pub fn resolve(setup: &SetupData) -> Option<Request> {
    resolve_in(&RULES, setup)
}
