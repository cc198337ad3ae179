//! Resolução ordenada de configuração
//!
//! Substitui as cadeias "tenta a tabela, senão variável de ambiente, senão erro" por uma
//! lista explícita de fontes tentadas em sequência: a primeira que devolver valor vence,
//! e o resultado carrega o nome da fonte para os logs.

/// Valor resolvido e a fonte que o forneceu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: &'static str,
}

type Step<'a, T> = (&'static str, Box<dyn FnOnce() -> Option<T> + 'a>);

pub struct ResolverChain<'a, T> {
    steps: Vec<Step<'a, T>>,
}

impl<'a, T> ResolverChain<'a, T> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Adiciona uma fonte ao fim da cadeia
    pub fn then(mut self, source: &'static str, step: impl FnOnce() -> Option<T> + 'a) -> Self {
        self.steps.push((source, Box::new(step)));
        self
    }

    /// Atalho para fontes que já são `Option`
    pub fn then_value(self, source: &'static str, value: Option<T>) -> Self
    where
        T: 'a,
    {
        self.then(source, move || value)
    }

    pub fn resolve(self) -> Option<Resolved<T>> {
        self.steps
            .into_iter()
            .find_map(|(source, step)| step().map(|value| Resolved { value, source }))
    }
}

impl<'a, T> Default for ResolverChain<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// String vazia ou só espaços conta como ausente
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_first_non_empty_source_wins() {
        let resolved = ResolverChain::new()
            .then_value("connection", None)
            .then_value("workspace", Some("https://n8n.tenant/webhook".to_string()))
            .then_value("default", Some("https://n8n.default/webhook".to_string()))
            .resolve()
            .unwrap();

        assert_eq!(resolved.value, "https://n8n.tenant/webhook");
        assert_eq!(resolved.source, "workspace");
    }

    #[test]
    fn test_later_steps_are_not_evaluated() {
        let evaluated = Cell::new(false);
        let resolved = ResolverChain::new()
            .then("primary", || Some(1))
            .then("secondary", || {
                evaluated.set(true);
                Some(2)
            })
            .resolve();

        assert_eq!(resolved.map(|r| r.value), Some(1));
        assert!(!evaluated.get());
    }

    #[test]
    fn test_empty_chain_resolves_to_none() {
        let resolved: Option<Resolved<String>> = ResolverChain::new().then_value("a", None).resolve();
        assert!(resolved.is_none());
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" x ")), Some("x".to_string()));
    }
}
