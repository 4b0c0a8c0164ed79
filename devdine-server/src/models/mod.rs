//! This module contains all the models used in the application.
pub mod otp;
pub mod user;
