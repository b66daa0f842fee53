//! Running a transfer under alternate Windows credentials.
//!
//! [`ImpersonationGuard::acquire`] logs the account on and impersonates it
//! on the calling thread. Windows impersonation is per thread, so the guard
//! also hands out a [`ThreadImpersonation`] that the batch scheduler applies
//! to each of its worker threads (see [`WorkerScope`]). Dropping the guard
//! reverts the calling thread and closes the logon token, on every exit path;
//! the workers revert when their batch finishes, before that.
//!
//! Impersonation only exists on Windows. Elsewhere `acquire` returns
//! [`Error::ImpersonationUnsupported`] and callers continue as the current
//! user.

use crate::batch::WorkerScope;
use crate::error::{Error, Result};

/// An account to impersonate.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account in `DOMAIN\user` form
    pub username: String,
    /// Account password
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Split the username into domain and user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Impersonation`] unless the username has exactly the
    /// `DOMAIN\user` shape with both parts non-empty.
    pub fn domain_and_user(&self) -> Result<(&str, &str)> {
        match self.username.split_once('\\') {
            Some((domain, user))
                if !domain.is_empty() && !user.is_empty() && !user.contains('\\') =>
            {
                Ok((domain, user))
            }
            _ => Err(Error::Impersonation {
                user: self.username.clone(),
                reason: "expected DOMAIN\\user".to_owned(),
            }),
        }
    }
}

/// Active impersonation. Reverts on drop.
#[derive(Debug)]
pub struct ImpersonationGuard {
    user: String,
    #[cfg(windows)]
    token: windows::Win32::Foundation::HANDLE,
}

impl ImpersonationGuard {
    /// Account being impersonated
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The same impersonation, for other threads.
    ///
    /// Only valid while this guard is alive.
    #[must_use]
    pub fn worker_scope(&self) -> ThreadImpersonation {
        ThreadImpersonation {
            user: self.user.clone(),
            #[cfg(windows)]
            token: self.token.0 as usize,
        }
    }
}

/// Impersonation of a guard's account on worker threads.
///
/// Obtained from [`ImpersonationGuard::worker_scope`].
#[derive(Debug, Clone)]
pub struct ThreadImpersonation {
    user: String,
    // Raw logon token owned by the guard
    #[cfg(windows)]
    token: usize,
}

impl ThreadImpersonation {
    /// Account being impersonated
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }
}

#[cfg(windows)]
mod imp {
    use super::{Credentials, ImpersonationGuard, ThreadImpersonation, WorkerScope};
    use crate::error::{Error, Result};
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Security::{
        ImpersonateLoggedOnUser, LOGON32_LOGON_INTERACTIVE, LOGON32_PROVIDER_DEFAULT, LogonUserW,
        RevertToSelf,
    };
    use std::ffi::c_void;
    use windows::core::PCWSTR;

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(Some(0)).collect()
    }

    impl ImpersonationGuard {
        /// Log on as `credentials` and impersonate the account.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Impersonation`] if the username is malformed, the
        /// logon is refused or impersonation fails.
        pub fn acquire(credentials: &Credentials) -> Result<Self> {
            let (domain, user) = credentials.domain_and_user()?;
            let fail = |e: windows::core::Error| Error::Impersonation {
                user: credentials.username.clone(),
                reason: e.message(),
            };

            let (user_w, domain_w, password_w) =
                (wide(user), wide(domain), wide(&credentials.password));
            let mut token = HANDLE::default();
            // SAFETY: all three strings are valid null-terminated wide strings
            // that outlive the call, and `token` is a valid out pointer.
            unsafe {
                LogonUserW(
                    PCWSTR(user_w.as_ptr()),
                    PCWSTR(domain_w.as_ptr()),
                    PCWSTR(password_w.as_ptr()),
                    LOGON32_LOGON_INTERACTIVE,
                    LOGON32_PROVIDER_DEFAULT,
                    &mut token,
                )
            }
            .map_err(fail)?;

            // SAFETY: `token` was just returned by a successful LogonUserW.
            if let Err(e) = unsafe { ImpersonateLoggedOnUser(token) } {
                // SAFETY: we own the token and nothing else refers to it.
                let _ = unsafe { CloseHandle(token) };
                return Err(fail(e));
            }

            tracing::info!(user = %credentials.username, "impersonating");
            Ok(Self {
                user: credentials.username.clone(),
                token,
            })
        }
    }

    impl WorkerScope for ThreadImpersonation {
        fn enter(&self) {
            let token = HANDLE(self.token as *mut c_void);
            // SAFETY: the token stays open while the owning guard is alive,
            // and the guard outlives the batch using this scope.
            if let Err(e) = unsafe { ImpersonateLoggedOnUser(token) } {
                tracing::error!(user = %self.user, error = %e, "worker failed to impersonate");
            }
        }

        fn exit(&self) {
            // SAFETY: reverting only affects the current thread's token.
            if let Err(e) = unsafe { RevertToSelf() } {
                tracing::error!(error = %e, "worker failed to revert impersonation");
            }
        }
    }

    impl Drop for ImpersonationGuard {
        fn drop(&mut self) {
            // SAFETY: this thread impersonates via `self.token`, which the
            // guard owns until this point.
            unsafe {
                if let Err(e) = RevertToSelf() {
                    tracing::error!(error = %e, "failed to revert impersonation");
                }
                let _ = CloseHandle(self.token);
            }
            tracing::info!(user = %self.user, "impersonation reverted");
        }
    }
}

// No guard can exist here, so there is never anything to apply
#[cfg(not(windows))]
impl WorkerScope for ThreadImpersonation {
    fn enter(&self) {}

    fn exit(&self) {}
}

#[cfg(not(windows))]
impl ImpersonationGuard {
    /// Log on as `credentials` and impersonate the account.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::ImpersonationUnsupported`] on this platform
    /// (after rejecting a malformed username).
    pub fn acquire(credentials: &Credentials) -> Result<Self> {
        credentials.domain_and_user()?;
        Err(Error::ImpersonationUnsupported(credentials.username.clone()))
    }
}

/// Try to impersonate `credentials`, falling back to the current user.
///
/// A failure is logged as a warning and `None` is returned.
pub fn impersonate_or_warn(credentials: &Credentials) -> Option<ImpersonationGuard> {
    match ImpersonationGuard::acquire(credentials) {
        Ok(guard) => Some(guard),
        Err(e) => {
            tracing::warn!(error = %e, "proceeding with current user credentials");
            None
        }
    }
}
