//! Supported target frameworks.
//!
//! # Examples
//!
//! ```
//! use contractgen_core::templates::TargetFramework;
//! use std::str::FromStr;
//!
//! let target = TargetFramework::from_str("symfony").unwrap();
//! assert_eq!(target, TargetFramework::Symfony);
//! assert_eq!(target.to_string(), "symfony");
//! assert_eq!(TargetFramework::default(), TargetFramework::Laravel);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// PHP frameworks the generator emits scaffolding for
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TargetFramework {
    /// Laravel: routes/api.php, invokable controllers, form requests
    #[default]
    Laravel,
    /// Symfony: attribute routing, validator constraints
    Symfony,
    /// Slim: PSR-15 request handlers and middleware
    Slim,
}

impl FromStr for TargetFramework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "laravel" => Ok(Self::Laravel),
            "symfony" => Ok(Self::Symfony),
            "slim" => Ok(Self::Slim),
            _ => Err(format!("Unknown target framework: {}", s)),
        }
    }
}

impl TargetFramework {
    /// Identifier used on the command line, in config files and as the
    /// template subdirectory name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Laravel => "laravel",
            Self::Symfony => "symfony",
            Self::Slim => "slim",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Laravel => "Laravel",
            Self::Symfony => "Symfony",
            Self::Slim => "Slim",
        }
    }

    /// Returns an iterator over all targets
    pub fn all() -> impl Iterator<Item = Self> {
        [Self::Laravel, Self::Symfony, Self::Slim].into_iter()
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_from_str() {
        assert_eq!("laravel".parse(), Ok(TargetFramework::Laravel));
        assert_eq!("Symfony".parse(), Ok(TargetFramework::Symfony));
        assert_eq!("SLIM".parse(), Ok(TargetFramework::Slim));
        assert!("rails".parse::<TargetFramework>().is_err());
    }

    #[test]
    fn test_all_is_unique() {
        let all: Vec<_> = TargetFramework::all().collect();
        assert_eq!(all.len(), 3);
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
        for target in all {
            assert_eq!(target.as_str().parse(), Ok(target));
        }
    }
}
