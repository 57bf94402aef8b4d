//! Compiler configuration.
//!
//! Read once when a [`Compiler`](crate::Compiler) is created. Environment
//! overrides:
//!
//! - `JB_LAST_TRANSFORMATION=<n>`: accept only transformations with a
//!   sequence index `<= n`; later ones are skipped and traced. Used to bisect
//!   which exact rewrite introduced a regression.
//! - `JB_VERIFY=0|1`: run the structural verifier after all transformations
//!   (default on).

/// Settings shared by every compilation of one compiler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Highest transformation index that may be applied.
    pub last_transformation_index: Option<u64>,
    /// Verify the graph before handing it to the lowering visitor.
    pub verify: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            last_transformation_index: None,
            verify: true,
        }
    }
}

impl CompilerConfig {
    /// Defaults overridden by `JB_LAST_TRANSFORMATION` and `JB_VERIFY`.
    pub fn from_env() -> Self {
        let last = std::env::var("JB_LAST_TRANSFORMATION").ok();
        let verify = std::env::var("JB_VERIFY").ok();
        Self::from_values(last.as_deref(), verify.as_deref())
    }

    /// Build from raw override strings. Unparseable values are ignored.
    pub(crate) fn from_values(last: Option<&str>, verify: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = last {
            match raw.trim().parse::<u64>() {
                Ok(n) => config.last_transformation_index = Some(n),
                Err(_) => tracing::warn!(value = raw, "ignoring malformed JB_LAST_TRANSFORMATION"),
            }
        }
        if let Some(raw) = verify {
            config.verify = !matches!(raw.trim(), "0" | "false" | "off");
        }
        config
    }

    /// Cutoff a transformation with this index is subject to.
    #[inline]
    pub fn accepts_transformation(&self, index: u64) -> bool {
        self.last_transformation_index.map_or(true, |last| index <= last)
    }
}
