use serde::{Deserialize, Deserializer};

// ---
// Helper de desserialização: campo "presente" vs "ausente" no PATCH
// ---
//
// Num update parcial precisamos distinguir três estados para cada campo:
//   - ausente do JSON            -> None            (não mexe)
//   - presente com null          -> Some(None)      (limpa a coluna)
//   - presente com valor         -> Some(Some(v))   (grava o valor)
//
// O serde sozinho colapsa "ausente" e "null" num único None. Com
// `#[serde(default, deserialize_with = "double_option")]` o campo vira
// Option<Option<T>> e o conjunto de campos alterados fica exato. É ele
// que o motor de sincronização usa para decidir o que propagar.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}
