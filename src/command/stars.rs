use anyhow::Result;

use crate::api::format_star_count;
use crate::command::display;
use crate::config::Config;

pub async fn run_stars(config: &Config) -> Result<()> {
    let client = display::build_public_client(config)?;
    let stars = client.github_stars().await;
    println!("⭐ {}", format_star_count(stars));
    Ok(())
}
