// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

pub mod descriptors;
pub mod dfu;
pub mod dispatch;
pub mod usbc_client_dfu;
