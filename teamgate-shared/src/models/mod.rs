/// Domain models for TeamGate
///
/// # Models
///
/// - `user`: User accounts, roles and the public user projection
/// - `team`: Teams and their member listings
///
/// Relations are id-based: a user points at its creator and team by id,
/// and manager/team links live in the store as id pairs. Nothing here
/// embeds another entity, so the admin → team → manager cycle never
/// materialises as an object graph.

pub mod team;
pub mod user;
