//! Scraper and chat-command core for the University of Pittsburgh's
//! PeopleSoft mobile class catalog.

pub mod catalog;
pub mod commands;
