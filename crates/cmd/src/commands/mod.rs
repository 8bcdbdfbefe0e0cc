// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub mod cat;
pub mod list;
pub mod mkdir;
pub mod mount;
pub mod put;
pub mod remove;
pub mod stat;
pub mod write;

pub use cat::cat_command;
pub use list::list_command;
pub use mkdir::mkdir_command;
pub use mount::{mount_command, parse_param};
pub use put::put_command;
pub use remove::remove_command;
pub use stat::stat_command;
pub use write::write_command;
