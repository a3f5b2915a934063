//! SMTP reply types.

/// A complete, possibly multi-line, server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Code shared by every line.
    pub code: ReplyCode,
    /// Text after the code on each line, in order.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    pub const fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        self.code.is_permanent()
    }

    /// Joins the message lines with newlines.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }
}

/// Three-digit SMTP reply code.
///
/// The first digit is the reply class: 2 completed, 3 waiting for more
/// input, 4 transient failure, 5 permanent failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 greeting.
    pub const SERVICE_READY: Self = Self(220);
    /// 221 reply to QUIT.
    pub const CLOSING: Self = Self(221);
    /// 250 action completed.
    pub const OK: Self = Self(250);
    /// 334 server challenge during AUTH.
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 reply to DATA.
    pub const START_DATA: Self = Self(354);
    /// 421 server shutting down.
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 535 credentials rejected.
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 mailbox unavailable.
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    const fn class(self) -> u16 {
        self.0 / 100
    }

    /// 2xx.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.class() == 2
    }

    /// 3xx.
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.class() == 3
    }

    /// 4xx.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.class() == 4
    }

    /// 5xx.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.class() == 5
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}
