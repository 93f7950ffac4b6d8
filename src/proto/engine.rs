//! Engine: the entry point hosts call
//!
//! An `Engine` holds nothing but its configuration. Every lowering builds
//! its own symbol table, so one engine can be shared across threads and
//! independent protocols lowered in parallel.

use super::ast::ProtocolDecl;
use super::codegen::{self, GeneratedModule};
use super::config::{GeneratorConfig, Loader};
use super::diagnostics::Diagnostic;
use super::error::Result;
use super::parsing::{self, RawItem};
use super::recognizer::Recognizer;

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: GeneratorConfig,
}

impl Engine {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Build an engine from a configuration loader.
    pub fn from_loader(loader: Loader) -> Result<Self> {
        Ok(Self::new(loader.build()?))
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn parse(&self, source: &str) -> Result<Vec<RawItem>, Diagnostic> {
        parsing::parse(source)
    }

    pub fn recognize(&self, source: &str) -> Result<Vec<ProtocolDecl>, Diagnostic> {
        let items = self.parse(source)?;
        Recognizer::new(source).recognize_file(items)
    }

    /// Lower one protocol. Nothing is returned for it if any rule fails.
    pub fn lower_protocol(&self, protocol: &ProtocolDecl) -> Result<GeneratedModule, Diagnostic> {
        let module = codegen::lower_protocol(protocol, &self.config);
        match &module {
            Ok(module) => tracing::debug!(
                protocol = %protocol.name,
                decls = module.decls.len(),
                "lowered protocol"
            ),
            Err(diagnostic) => tracing::debug!(
                protocol = %protocol.name,
                kind = %diagnostic.kind,
                "lowering aborted"
            ),
        }
        module
    }

    /// Lower every protocol in `source`; the first diagnostic wins.
    pub fn lower_source(&self, source: &str) -> Result<Vec<GeneratedModule>, Diagnostic> {
        self.recognize(source)?
            .iter()
            .map(|protocol| self.lower_protocol(protocol))
            .collect()
    }

    /// Lower every protocol in `source` independently.
    ///
    /// Front-end failures still fail the whole source, since no protocol
    /// boundaries are known before recognition succeeds.
    pub fn lower_each(
        &self,
        source: &str,
    ) -> Result<Vec<Result<GeneratedModule, Diagnostic>>, Diagnostic> {
        Ok(self
            .recognize(source)?
            .iter()
            .map(|protocol| self.lower_protocol(protocol))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::diagnostics::DiagnosticKind;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_engine_is_send_and_sync() {
        assert_send_sync::<Engine>();
    }

    #[test]
    fn test_lower_each_keeps_good_protocols() {
        let source = "\
protocol A:
  proc a(self): number
  impl X:
    proc b(self): number = 1
protocol B:
  proc b(self): number
  impl Y:
    proc b(self): number = 2
";
        let engine = Engine::default();
        let results = engine.lower_each(source).unwrap();
        assert_eq!(
            results[0].as_ref().unwrap_err().kind,
            DiagnosticKind::UnknownOverrideTarget
        );
        assert!(results[1].is_ok());
        assert_eq!(
            engine.lower_source(source).unwrap_err().kind,
            DiagnosticKind::UnknownOverrideTarget
        );
    }

    #[test]
    fn test_from_loader() {
        let loader = Loader::new()
            .set_override("lowering.coverage", "strict")
            .unwrap();
        let engine = Engine::from_loader(loader).unwrap();
        assert_eq!(
            engine.config().lowering.coverage,
            crate::proto::config::Coverage::Strict
        );
    }
}
