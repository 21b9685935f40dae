//! Scheduling and routing services

pub mod business_time;
pub mod cache;
pub mod city;
pub mod delivery_planner;
pub mod geo;
pub mod geolocation;
pub mod ip_api;
pub mod locator;
pub mod opening_hours;
pub mod schedule_parser;
pub mod scheduling;
