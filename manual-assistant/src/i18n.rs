use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use tracing::{debug, warn};
use unic_langid::LanguageIdentifier;

const ES_TRANSLATIONS: &str = r#"
# Manual assistant gateway - Spanish translations

# Errors
error-missing-parameter = Falta el parámetro { $name }
error-forbidden = Prohibido: clave API inválida o ausente
error-run-stalled = El asistente no terminó de responder a tiempo. Inténtalo de nuevo.
error-cancelled = El servicio se está deteniendo; la consulta fue cancelada.
error-internal = Ocurrió un error interno

# Document search
search-intro = He encontrado los siguientes documentos:
search-no-results = No he encontrado documentos para esa búsqueda.
search-result-title = Título: { $title }
search-result-url = URL: { $url }
search-result-description = Descripción: { $description }
search-result-page = Página: { $page }
search-error = Error al realizar la búsqueda: { $error }

# Chat
topic-refusal = Lo siento, solo puedo ayudarte con consultas de mecánica automotriz: manuales, esquemas eléctricos, motores, frenos y otros componentes de vehículos.

# Health
health-status-healthy = El servicio está operativo
"#;

const EN_TRANSLATIONS: &str = r#"
# Manual assistant gateway - English translations

# Errors
error-missing-parameter = Missing required parameter: { $name }
error-forbidden = Forbidden: invalid or missing API key
error-run-stalled = The assistant did not finish answering in time. Please try again.
error-cancelled = The service is shutting down; the request was cancelled.
error-internal = An internal error occurred

# Document search
search-intro = I found the following documents:
search-no-results = I could not find any documents for that search.
search-result-title = Title: { $title }
search-result-url = URL: { $url }
search-result-description = Description: { $description }
search-result-page = Page: { $page }
search-error = Error while searching: { $error }

# Chat
topic-refusal = Sorry, I can only help with automotive mechanics questions: manuals, wiring diagrams, engines, brakes and other vehicle components.

# Health
health-status-healthy = Service is healthy
"#;

/// Internationalization service using Fluent
pub struct I18n {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
    default_locale: String,
}

impl I18n {
    /// Create a new i18n service with the embedded Spanish and English
    /// translations, falling back to `default_locale` for unknown locales.
    pub fn new(default_locale: &str) -> Self {
        let mut i18n = Self {
            bundles: HashMap::new(),
            default_locale: default_locale.to_string(),
        };

        for (locale, content) in [("es", ES_TRANSLATIONS), ("en", EN_TRANSLATIONS)] {
            if let Err(e) = i18n.add_locale(locale, content) {
                warn!(locale = %locale, error = %e, "Failed to load embedded translations");
            }
        }

        i18n
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Add a locale with translations
    pub fn add_locale(&mut self, locale: &str, content: &str) -> Result<(), String> {
        let lang_id: LanguageIdentifier = locale
            .parse()
            .map_err(|e| format!("Invalid locale '{}': {}", locale, e))?;

        let resource = FluentResource::try_new(content.to_string())
            .map_err(|(_, errors)| format!("Failed to parse Fluent resource: {:?}", errors))?;

        let mut bundle = FluentBundle::new_concurrent(vec![lang_id]);
        // Messages end up in plain-text tool outputs and JSON bodies
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| format!("Failed to add resource to bundle: {:?}", errors))?;

        self.bundles.insert(locale.to_string(), bundle);

        debug!(locale = %locale, "Loaded translations");

        Ok(())
    }

    /// Get a translated message
    pub fn get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> String {
        // Try requested locale, fall back to default, fall back to key
        self.try_get(locale, key, args)
            .or_else(|| self.try_get(&self.default_locale, key, args))
            .unwrap_or_else(|| key.to_string())
    }

    /// Try to get a translation from a specific locale
    fn try_get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> Option<String> {
        let bundle = self.bundles.get(locale)?;
        let message = bundle.get_message(key)?;
        let pattern = message.value()?;

        let mut errors = vec![];
        let result = bundle.format_pattern(pattern, args, &mut errors);

        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Fluent formatting errors");
        }

        Some(result.to_string())
    }

    /// Get a translated message with arguments
    pub fn format(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (k, v) in args {
            fluent_args.set(*k, *v);
        }
        self.get(locale, key, Some(&fluent_args))
    }

    /// Translated message in the default locale
    pub fn text(&self, key: &str) -> String {
        self.get(&self.default_locale, key, None)
    }

    /// Translated message with arguments in the default locale
    pub fn text_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.format(&self.default_locale, key, args)
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("es")
    }
}
