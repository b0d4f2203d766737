use kdl::KdlDocument;
use once_cell::sync::Lazy;

const FALLBACK_LANG: &str = "en";

static POT: Lazy<KdlDocument> = Lazy::new(|| {
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res/pot.kdl"))
        .parse()
        .unwrap_or_else(|err| {
            tracing::error!("pot.kdl failed to parse: {err}");
            KdlDocument::new()
        })
});

static LANG: Lazy<String> = Lazy::new(|| {
    let locale = std::env::var("LANGUAGE")
        .or_else(|_| std::env::var("LANG"))
        .unwrap_or_else(|_| String::from("en_US.UTF-8"));
    language_of(&locale)
});

/// `en_US.UTF-8` and `en:de` both pick `en`.
fn language_of(locale: &str) -> String {
    locale
        .split(|c| c == ':' || c == '_' || c == '.' || c == '@' || c == '-')
        .next()
        .filter(|lang| !lang.is_empty())
        .unwrap_or(FALLBACK_LANG)
        .to_lowercase()
}

macro_rules! messages {
    ($($variant:ident),* $(,)?) => {
        #[derive(Clone, Copy, Debug)]
        pub enum Message {
            $($variant),*
        }

        impl Message {
            #[cfg(test)]
            fn all_strs() -> &'static [&'static str] {
                &[$(stringify!($variant)),*]
            }

            fn as_str(&self) -> &'static str {
                use Message::*;
                match self {
                    $($variant => stringify!($variant)),*
                }
            }
        }
    };
}

messages!(
    CouldNotOpenConfigFile,
    CouldNotSaveConfigFile,
    CouldNotOpenDatabase,
    CouldNotLoadNote,
    CouldNotSaveStrokes,
    CouldNotDecodeElement,
    CouldNotReadImport,
    NoNotes,
    NoteCreated,
    NoteDeleted,
    ImportedStrokes,
    MissingCommand,
);

#[macro_export]
macro_rules! s {
    ($variant:ident) => {
        $crate::i18n::get_str($crate::i18n::Message::$variant)
    };
    (&$variant:ident) => {
        $crate::i18n::get_str($crate::i18n::Message::$variant).as_str()
    };
}

fn lookup(lang: &str, key: Message) -> Option<String> {
    POT.get(lang)?
        .children()?
        .get(key.as_str())?
        .get(0)?
        .value()
        .as_string()
        .map(String::from)
}

pub fn get_str(key: Message) -> String {
    lookup(&LANG, key)
        .or_else(|| lookup(FALLBACK_LANG, key))
        .unwrap_or_else(|| {
            tracing::warn!("missing message {}", key.as_str());
            String::from(key.as_str())
        })
}
