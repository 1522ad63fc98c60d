pub mod action;
pub mod card;
pub mod color;
pub mod config;
pub mod game_phase;
pub mod game_state;
pub mod manager;
pub mod map;
pub mod participant;
pub mod place;
pub mod player;
pub mod referee;
pub mod strategy;

#[macro_use]
extern crate lazy_static;
