use ort::execution_providers::ExecutionProviderDispatch;

/// Which inference backend the detector session should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Acceleration {
    /// Platform accelerator when it registers, CPU otherwise.
    #[default]
    Auto,
    /// Platform accelerator or nothing: registration failure fails the load.
    Required,
    Cpu,
}

impl std::str::FromStr for Acceleration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "required" => Ok(Self::Required),
            "cpu" => Ok(Self::Cpu),
            other => Err(format!("unknown acceleration '{other}' (auto, required, cpu)")),
        }
    }
}

/// Execution providers for the requested acceleration on this platform.
///
/// An empty list means ONNX Runtime's default CPU provider.
pub fn execution_providers(acceleration: Acceleration) -> Vec<ExecutionProviderDispatch> {
    match acceleration {
        Acceleration::Cpu => vec![],
        Acceleration::Auto => platform_providers(),
        Acceleration::Required => platform_providers()
            .into_iter()
            .map(|ep| ep.error_on_failure())
            .collect(),
    }
}

fn platform_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
