// Network adapter modules split by game sockets vs lobby HTTP routes.

pub mod client;
pub mod internal;

pub use client::{spawn_lobby_serializer, ws_handler};
pub use internal::{create_lobby_handler, list_lobbies_handler};
