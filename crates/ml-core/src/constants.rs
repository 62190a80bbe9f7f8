//! Constantes del motor core.
//!
//! `CORE_VERSION` participa en el cálculo del `definition_hash`: un cambio de
//! versión del motor invalida determinísticamente las definiciones
//! almacenadas aunque el grafo no cambie. Mantener estable mientras no haya
//! cambios incompatibles.

/// Versión lógica del motor.
pub const CORE_VERSION: &str = "M1.0";
