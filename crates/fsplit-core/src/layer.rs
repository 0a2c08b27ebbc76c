//! Filtering-engine layer identities.
//!
//! Each classification function is installed at a fixed set of
//! (layer, address family) combinations; the layer identity travels with
//! every event and is checked against the callout that receives it.

use std::fmt;

/// Address family of a layer or event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl AddressFamily {
    /// Short label used in display names
    pub fn label(&self) -> &'static str {
        match self {
            Self::V4 => "IPv4",
            Self::V6 => "IPv6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Network layer at which a classification function is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Outbound bind redirection, IPv4
    BindRedirectV4,
    /// Outbound bind redirection, IPv6
    BindRedirectV6,
    /// Outbound connection authorization, IPv4
    AuthConnectV4,
    /// Outbound connection authorization, IPv6
    AuthConnectV6,
    /// Inbound accept authorization, IPv4
    AuthRecvAcceptV4,
    /// Inbound accept authorization, IPv6
    AuthRecvAcceptV6,
}

impl Layer {
    /// Every layer the engine dispatches on
    pub const ALL: [Layer; 6] = [
        Layer::BindRedirectV4,
        Layer::BindRedirectV6,
        Layer::AuthConnectV4,
        Layer::AuthConnectV6,
        Layer::AuthRecvAcceptV4,
        Layer::AuthRecvAcceptV6,
    ];

    /// Address family of this layer
    pub fn family(&self) -> AddressFamily {
        match self {
            Self::BindRedirectV4 | Self::AuthConnectV4 | Self::AuthRecvAcceptV4 => AddressFamily::V4,
            Self::BindRedirectV6 | Self::AuthConnectV6 | Self::AuthRecvAcceptV6 => AddressFamily::V6,
        }
    }

    /// Whether this is a bind-redirect layer
    pub fn is_bind_redirect(&self) -> bool {
        matches!(self, Self::BindRedirectV4 | Self::BindRedirectV6)
    }

    /// Whether this is a connect/accept authorization layer
    pub fn is_connection_auth(&self) -> bool {
        matches!(
            self,
            Self::AuthConnectV4 | Self::AuthConnectV6 | Self::AuthRecvAcceptV4 | Self::AuthRecvAcceptV6
        )
    }

    /// Stable label used in keys and log lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::BindRedirectV4 => "bind-redirect-v4",
            Self::BindRedirectV6 => "bind-redirect-v6",
            Self::AuthConnectV4 => "auth-connect-v4",
            Self::AuthConnectV6 => "auth-connect-v6",
            Self::AuthRecvAcceptV4 => "auth-recv-accept-v4",
            Self::AuthRecvAcceptV6 => "auth-recv-accept-v6",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
