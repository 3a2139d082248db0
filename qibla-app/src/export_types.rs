use std::borrow::Cow;

use qibla_app_lib::mk_specta;
use specta_typescript::Typescript;

/// Writes the TypeScript bindings for the finder screen's commands, events and state
pub fn main() {
    let args = std::env::args().collect::<Vec<_>>();
    let path = args.get(1).expect("Usage: export-types <bindings.ts>");
    let mut lang = Typescript::new();
    lang.header = Cow::Borrowed(
        "// Qibla Finder bindings, regenerate with `cargo run --bin export-types`\n/* eslint @typescript-eslint/no-unused-vars: 0 */\n/* eslint @typescript-eslint/no-explicit-any: 0 */",
    );
    mk_specta()
        .export(lang, path)
        .expect("Failed to export qibla bindings");
    println!("Wrote qibla finder commands, events, and state types to {path}");
}
