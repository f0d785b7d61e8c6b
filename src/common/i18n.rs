// src/common/i18n.rs

use std::{collections::HashMap, sync::LazyLock};

const DEFAULT_LANG: &str = "pt";

// Tabelas embutidas no binário; o idioma vem do Accept-Language.
static BUILTIN: LazyLock<I18nStore> = LazyLock::new(I18nStore::builtin);

#[derive(Debug, Clone, Default)]
pub struct I18nStore {
    messages: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn builtin() -> Self {
        let mut store = Self::default();
        store.load("pt", include_str!("../../locales/pt.json"));
        store.load("en", include_str!("../../locales/en.json"));
        store
    }

    pub fn builtin_ref() -> &'static I18nStore {
        &BUILTIN
    }

    fn load(&mut self, lang: &str, raw: &str) {
        match serde_json::from_str::<HashMap<String, String>>(raw) {
            Ok(table) => {
                self.messages.insert(lang.to_string(), table);
            }
            Err(e) => tracing::error!("🔥 Tabela de idioma '{}' inválida: {}", lang, e),
        }
    }

    /// Busca a chave no idioma pedido, cai para o português e, por fim,
    /// devolve a própria chave.
    pub fn translate<'a>(&'a self, lang: &str, key: &'a str) -> &'a str {
        self.messages
            .get(lang)
            .and_then(|table| table.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|t| t.get(key)))
            .map(String::as_str)
            .unwrap_or(key)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_share_the_same_keys() {
        let store = I18nStore::builtin();
        let pt = &store.messages["pt"];
        let en = &store.messages["en"];
        assert!(!pt.is_empty());
        for key in pt.keys() {
            assert!(en.contains_key(key), "missing en key {key}");
        }
    }

    #[test]
    fn unknown_language_falls_back_to_portuguese() {
        let store = I18nStore::builtin();
        assert_eq!(store.translate("de", "schedule_conflict"), "Conflito de agendamento.");
        assert_eq!(store.translate("en", "schedule_conflict"), "Scheduling conflict.");
        assert_eq!(store.translate("en", "no_such_key"), "no_such_key");
    }
}
