// ─── uproject core ───
// Project descriptor discovery, engine resolution and target enumeration.
//
// Architecture:
//   core/
//     project/  .uproject discovery (sync + async) and descriptor model
//     engine/   registry stores + association → install directory race
//     targets/  target matrix per host platform family
//     config    registry locations
//     error     crate-wide error type

pub mod config;
pub mod engine;
pub mod error;
pub mod project;
pub mod targets;
