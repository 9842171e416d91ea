//! Utilities for binding a hardware timer peripheral to [`soft_timer`].
#![no_std]

pub mod prescaler;
