/*!
 * Exposed Properties
 */

use std::fmt;
use std::str::FromStr;

/// The node properties reachable through a capability; nothing else is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Style,
    Src,
    Alt,
    Class,
    Type,
    Value,
    Height,
    Width,
}

impl Property {
    pub const ALL: [Property; 8] = [
        Property::Style,
        Property::Src,
        Property::Alt,
        Property::Class,
        Property::Type,
        Property::Value,
        Property::Height,
        Property::Width,
    ];

    /// Raw attribute name on the host node
    pub fn name(&self) -> &'static str {
        match self {
            Property::Style => "style",
            Property::Src => "src",
            Property::Alt => "alt",
            Property::Class => "class",
            Property::Type => "type",
            Property::Value => "value",
            Property::Height => "height",
            Property::Width => "width",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Property::Style)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Property::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or(())
    }
}
