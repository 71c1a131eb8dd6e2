use crate::errors::RestoreServiceError;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

/// Create and configure progress bar for the dump download.
/// Falls back to a byte-counting spinner when the server sends no length.
pub fn create_download_progress_bar(total: Option<u64>) -> Result<ProgressBar, RestoreServiceError> {
    let pb = match total {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
                    .progress_chars("#>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {bytes} {msg}")?);
            pb
        }
    };
    Ok(pb)
}

/// Simple confirmation dialog
pub fn confirm_action(prompt: &str, default: bool) -> Result<bool, RestoreServiceError> {
    let result = Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_length() -> Result<(), RestoreServiceError> {
        let pb = create_download_progress_bar(Some(4096))?;
        assert_eq!(pb.length(), Some(4096));

        let spinner = create_download_progress_bar(None)?;
        assert_eq!(spinner.length(), None);
        Ok(())
    }
}
