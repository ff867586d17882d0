pub mod abbrev;
pub mod budget;
pub mod config;
pub mod gateway;
pub mod hatnote;
pub mod mediawiki;
pub mod redirect;
pub mod run;
pub mod runtime;

#[cfg(test)]
mod fake;
