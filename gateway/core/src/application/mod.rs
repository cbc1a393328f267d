// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod command_gateway;
pub mod dispatcher;

pub use command_gateway::{CommandGateway, CommandInvocation, CommandOutput, ProgramLocator, WhichLocator};
pub use dispatcher::{Dispatcher, DispatcherBuilder, COMMAND_HEADER, TOKEN_HEADER};
