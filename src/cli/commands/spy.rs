//! `spy` command
//!
//! Resolves scroll-spy for one scroll position over the configured layout.

use serde_json::json;

use crate::cli::args::{OutputFormat, SpyArgs};
use crate::config::schema::IntroConfig;
use crate::error::IntroError;
use crate::page::document::SectionBounds;
use crate::sequencer::spy::{SpyReading, resolve};

use super::load_config;

fn reading(config: &IntroConfig, scroll_y: f64) -> SpyReading {
    let sections: Vec<SectionBounds> = config
        .page
        .sections
        .iter()
        .map(|s| SectionBounds {
            id: s.id.clone(),
            top: s.top,
            height: s.height,
        })
        .collect();
    resolve(
        &sections,
        scroll_y,
        config.page.viewport_height,
        &config.scroll_spy,
    )
}

/// Print the active section and quote visibility for `--scroll-y`.
///
/// # Errors
///
/// Returns a config error if the configuration cannot be loaded.
pub fn run(args: &SpyArgs) -> Result<(), IntroError> {
    let config = load_config(args.config.as_deref())?;
    let reading = reading(&config, args.scroll_y);
    tracing::debug!(scroll_y = args.scroll_y, ?reading, "scroll-spy resolved");

    match args.format {
        OutputFormat::Human => {
            match (&reading.active_section, reading.active_href()) {
                (Some(id), Some(href)) => println!("active: {id} ({href})"),
                _ => println!("active: none"),
            }
            println!(
                "quote: {}",
                if reading.quote_visible { "visible" } else { "hidden" }
            );
        }
        OutputFormat::Json => println!(
            "{}",
            json!({
                "scroll_y": args.scroll_y,
                "active_section": reading.active_section,
                "active_href": reading.active_href(),
                "quote_visible": reading.quote_visible,
            })
        ),
    }
    Ok(())
}
