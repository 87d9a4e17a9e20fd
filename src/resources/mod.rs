//! Idempotent working-tree primitives: tree copies, removals and the
//! ignore list.
pub mod fs;
pub mod ignore;
