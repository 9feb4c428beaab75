use crate::util::sha256_hex;

/// Number of leading `prompt_message` characters folded into a synthesized id.
pub const ID_MESSAGE_PREFIX_CHARS: usize = 32;

const ID_HASH_CHARS: usize = 16;

/// Deterministic id for a prompt the API delivered without one.
///
/// Pure in `(bundle, recipe, index, message prefix)`: two prompts sharing all
/// four inputs get the same id, and ingest reports the pair as a duplicate.
pub fn synthesize_prompt_id(
    bundle: &str,
    recipe: &str,
    index: usize,
    prompt_message: &str,
) -> String {
    let prefix: String = prompt_message
        .chars()
        .take(ID_MESSAGE_PREFIX_CHARS)
        .collect();
    let index = index.to_string();
    let digest = sha256_hex(&[bundle, recipe, &index, &prefix]);
    format!("p-{}", &digest[..ID_HASH_CHARS])
}

pub fn resolve_prompt_id(
    supplied: Option<&str>,
    bundle: &str,
    recipe: &str,
    index: usize,
    prompt_message: &str,
) -> String {
    match supplied.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => synthesize_prompt_id(bundle, recipe, index, prompt_message),
    }
}
