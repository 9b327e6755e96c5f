// Per-tick simulation steps, each an `impl World` block driven by `World::tick`.

pub mod bombs;
pub mod bots;
pub mod bricks;
pub mod movement;
