use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("tried to register a client with the {signaller} signaller after it was built")]
    RegisteredAfterBuild { signaller: &'static str },

    #[error("the {signaller} signaller was built more than once")]
    BuiltTwice { signaller: &'static str },

    #[error("the {signaller} signaller was set up without registering with the {dependency} signaller")]
    MissingRegistration {
        signaller:  &'static str,
        dependency: &'static str,
    },
}

pub type SignalResult<T> = Result<T, SignalError>;
