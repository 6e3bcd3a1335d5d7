#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid layout option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    #[error("invalid layout options JSON: {0}")]
    OptionsJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn ensure_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidOption {
            name,
            reason: format!("expected a finite number, got {value}"),
        })
    }
}

pub(crate) fn ensure_non_negative(name: &'static str, value: f64) -> Result<()> {
    ensure_finite(name, value)?;
    if value < 0.0 {
        return Err(Error::InvalidOption {
            name,
            reason: format!("expected a non-negative number, got {value}"),
        });
    }
    Ok(())
}

pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    ensure_finite(name, value)?;
    if value <= 0.0 {
        return Err(Error::InvalidOption {
            name,
            reason: format!("expected a positive number, got {value}"),
        });
    }
    Ok(())
}
