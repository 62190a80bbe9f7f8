use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Token de cancelación compartible entre el caller y el engine.
///
/// El engine lo observa entre rondas de sondeo: al verlo activado deja de
/// someter steps nuevos, pide cancelación best-effort de los jobs en vuelo y
/// marca como `Skipped` los steps que nunca arrancaron. Los outputs ya
/// registrados no se tocan.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
