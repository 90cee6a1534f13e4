//! Tool handler registry and the built-in container actions.
//!
//! Each action is a `ToolHandler` registered under its name; the executor
//! resolves plan entries against the registry and never matches on names
//! itself.

use std::time::Duration;

mod registry;
pub mod params;

pub use registry::{RegisteredTool, ToolDescriptor, ToolFuture, ToolHandler, ToolRegistry};

// Tool handler implementations
mod create_network;
mod create_container;
mod create_volume;
mod run_container;
mod pull_image;

pub use create_network::CreateNetworkHandler;
pub use create_container::CreateContainerHandler;
pub use create_volume::CreateVolumeHandler;
pub use run_container::RunContainerHandler;
pub use pull_image::{DEFAULT_PULL_TIMEOUT, PullImageHandler};

/// Registry with every built-in container action.
pub fn builtin_registry(pull_timeout: Duration) -> ToolRegistry {
    ToolRegistry::new()
        .register(
            CreateNetworkHandler::NAME,
            CreateNetworkHandler::DESCRIPTION,
            CreateNetworkHandler::input_schema(),
            CreateNetworkHandler,
        )
        .register(
            CreateContainerHandler::NAME,
            CreateContainerHandler::DESCRIPTION,
            CreateContainerHandler::input_schema(),
            CreateContainerHandler,
        )
        .register(
            CreateVolumeHandler::NAME,
            CreateVolumeHandler::DESCRIPTION,
            CreateVolumeHandler::input_schema(),
            CreateVolumeHandler,
        )
        .register(
            RunContainerHandler::NAME,
            RunContainerHandler::DESCRIPTION,
            RunContainerHandler::input_schema(),
            RunContainerHandler,
        )
        .register(
            PullImageHandler::NAME,
            PullImageHandler::DESCRIPTION,
            PullImageHandler::input_schema(),
            PullImageHandler::new(pull_timeout),
        )
}
