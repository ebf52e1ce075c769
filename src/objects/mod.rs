//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Opaque object types (§4.3): the shape a user type must implement
//! to plug into the codec, and the two in-tree examples named by the
//! spec plus the fixed-point float encoding chosen for the open
//! question in §9.

pub mod fixed_point;
pub mod route_obj;
pub mod string_obj;

pub use route_obj::{Address, DsonRouteObj};
pub use string_obj::DsonStringObj;
