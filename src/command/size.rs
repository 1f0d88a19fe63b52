use anyhow::{bail, Result};

use crate::size_scale::{self, MAX_SIZE_KB, SLIDER_MAX};

/// Print the slider position and cutoff for either input.
pub async fn run_size(position: Option<u32>, kb: Option<u32>) -> Result<()> {
    let position = match (position, kb) {
        (Some(position), _) => {
            if position > SLIDER_MAX {
                bail!("Slider position must be between 0 and {}", SLIDER_MAX);
            }
            position
        }
        (None, Some(kb)) => {
            if kb == 0 || kb > MAX_SIZE_KB {
                bail!("Size must be between 1 and {} kb", MAX_SIZE_KB);
            }
            size_scale::size_to_position(f64::from(kb))
        }
        (None, None) => bail!("Pass a slider position or --kb"),
    };

    println!("{}", describe(position));
    Ok(())
}

fn describe(position: u32) -> String {
    let size_kb = size_scale::position_to_size(position);
    format!(
        "slider {} = {} ({} kb)",
        position,
        size_scale::format_size(size_kb),
        size_kb
    )
}
