//! Result codes and error types
use core::fmt;

/// The macro to define [`ResultCode`].
macro_rules! define_result_code {
    (
        $( #[$meta:meta] )*
        pub enum ResultCode {
            $(
                $( #[$vmeta:meta] )*
                $vname:ident = $vd:expr
            ),* $(,)*
        }
    ) => {
        $( #[$meta] )*
        pub enum ResultCode {
            $(
                $( #[$vmeta] )*
                $vname = $vd
            ),*
        }

        impl ResultCode {
            /// Get the short name of the result code.
            ///
            /// # Examples
            ///
            /// ```
            /// use soft_timer::ResultCode;
            /// assert_eq!(ResultCode::InvalidState.as_str(), "InvalidState");
            /// ```
            pub fn as_str(self) -> &'static str {
                match self {
                    $(
                        Self::$vname => stringify!($vname),
                    )*
                }
            }

            fn fmt(self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl fmt::Debug for ResultCode {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                (*self).fmt(f)
            }
        }
    };
}

define_result_code! {
    /// All result codes (including success) that the timer operations can
    /// report.
    ///
    /// The numeric values are stable so that the codes can be handed across an
    /// FFI boundary or stored in a status register.
    ///
    /// # Rationale
    ///
    /// Success is zero and every failure is negative, following the C
    /// convention of status-returning functions (`if (status < 0)`). The
    /// values fit in `i8`, so a code can be returned through the narrowest
    /// integer type that C callers use for status codes, and the error types
    /// generated from this enum share its representation.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[repr(i8)]
    pub enum ResultCode {
        /// The operation was successful.
        Success = 0,
        /// A handle is out of range or absent, or a reload value is outside
        /// `2..=max_reload_ms`.
        InvalidParameter = -1,
        /// The operation is not allowed in the timer's current state, e.g.,
        /// starting a timer that is already running.
        InvalidState = -2,
        /// The current context disallows the operation, e.g., the timer
        /// interrupt is already masked by an enclosing critical section.
        BadContext = -3,
        /// The shared engine has not been initialized yet.
        NotInitialized = -4,
    }
}

impl ResultCode {
    /// Return `true` iff `self` is [`Self::Success`].
    #[inline]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl<E: Into<ResultCode>> From<Result<(), E>> for ResultCode {
    #[inline]
    fn from(x: Result<(), E>) -> Self {
        match x {
            Ok(()) => Self::Success,
            Err(e) => e.into(),
        }
    }
}

/// Define an error type whose variants are a subset of [`ResultCode`].
macro_rules! define_error {
    (
        $( #[doc $( $doc:tt )*] )*
        $( #[into( $Supererror:path )] )*
        $vis:vis enum $Name:ident {
            $( $Variant:ident, )*
        }
    ) => {
        $( #[doc $( $doc )*] )*
        #[repr(i8)]
        #[derive(PartialEq, Eq, Copy, Clone, Hash)]
        $vis enum $Name {
            $( $Variant = ResultCode::$Variant as _ ),*
        }

        impl fmt::Debug for $Name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                ResultCode::from(*self).fmt(f)
            }
        }

        impl fmt::Display for $Name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(ResultCode::from(*self).as_str())
            }
        }

        define_error! {
            @into
            #[into(ResultCode)]
            $( #[into( $Supererror )] )*
            enum $Name {
                $( $Variant, )*
            }
        }
    };

    (
        @into
        #[into( $Supererror0:path )]
        $( #[into( $Supererror:path )] )*
        enum $Name:ident {
            $( $Variant:ident, )*
        }
    ) => {
        impl From<$Name> for $Supererror0 {
            #[inline]
            fn from(x: $Name) -> Self {
                match x {
                    $( $Name::$Variant => Self::$Variant ),*
                }
            }
        }

        define_error! {
            @into
            $( #[into( $Supererror )] )*
            enum $Name {
                $( $Variant, )*
            }
        }
    };

    ( @into enum $($_:tt)* ) => {};
}

define_error! {
    /// Error type for the timer operations ([`create`] excluded, which
    /// reports pool exhaustion as `None`).
    ///
    /// A failed operation leaves the pool untouched.
    ///
    /// [`create`]: crate::SoftTimers::create
    pub enum TimerError {
        InvalidParameter,
        InvalidState,
    }
}

define_error! {
    /// Error type for accessing a [`SharedSoftTimers`].
    ///
    /// [`SharedSoftTimers`]: crate::SharedSoftTimers
    pub enum AccessError {
        BadContext,
        NotInitialized,
    }
}

define_error! {
    /// `BadContext`
    #[into(AccessError)]
    pub enum BadContextError {
        BadContext,
    }
}
