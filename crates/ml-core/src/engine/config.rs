use std::time::Duration;

/// Configuración explícita del engine, con ciclo de vida acotado a una
/// instancia. No hay estado global de sesión: quien construye el engine
/// decide estos valores.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pausa entre rondas de sondeo cuando ningún job cambió de estado.
    pub poll_interval: Duration,
    /// Deadline por step cuando el step no declara el suyo. `None` = sin
    /// límite (el core no impone timeouts propios).
    pub default_step_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(200),
               default_step_timeout: None }
    }
}
