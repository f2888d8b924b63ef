#[cfg(not(target_arch = "wasm32"))]
use pyo3::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

mod ast;
mod compiler;
mod error;
mod label;
mod paginate;
mod parser;
mod preview;
mod tokens;
mod tree;
mod types;

pub use ast::{CodePage, MenuEntry, MenuPage, NotePage, Page};
pub use compiler::{generate, generate_or_message, CompilerState, Program, MAX_MENU_OPTIONS};
pub use error::{GenerateError, ParseError, TreeError, TreeResult};
pub use label::{InvalidLabel, Label, LabelAllocator, MAX_LABELS};
pub use paginate::{line_break_info, paginate, wrap, LineBreakInfo, NoteUnit};
pub use parser::parse;
pub use preview::{
    find_code_section, label_for_node, parse_menu_code, parse_note_code, MenuOption, MenuPreview,
    ScreenItem,
};
pub use tokens::{find_invalid, find_invalid_in_tree, find_invalid_title, TokenDictionary};
pub use tree::{
    extract, find_node, find_parent, insert, resolve_placement, update_item, DropPosition,
    NodeUpdate, Placement,
};
pub use types::{AppStructure, NodeBody, NodeKind, Settings, StructureNode, ROOT_ID};

fn generate_json(structure_json: &str) -> Result<String, String> {
    let structure = AppStructure::from_json(structure_json).map_err(|e| e.to_string())?;
    Ok(generate_or_message(&structure))
}

fn parse_json(text: &str) -> Result<String, String> {
    let structure = parse(text).map_err(|e| e.to_string())?;
    structure.to_json().map_err(|e| e.to_string())
}

fn invalid_tokens(content: &str, tokens: Vec<String>, forbid_special: bool) -> Vec<String> {
    let dictionary = TokenDictionary::new(tokens);
    find_invalid(content, &dictionary, forbid_special)
        .into_iter()
        .collect()
}

#[cfg(not(target_arch = "wasm32"))]
#[pyfunction]
fn generate_code(structure_json: String) -> PyResult<String> {
    generate_json(&structure_json).map_err(PyErr::new::<pyo3::exceptions::PyValueError, _>)
}

#[cfg(not(target_arch = "wasm32"))]
#[pyfunction]
fn parse_code(text: String) -> PyResult<String> {
    parse_json(&text).map_err(PyErr::new::<pyo3::exceptions::PyValueError, _>)
}

#[cfg(not(target_arch = "wasm32"))]
#[pyfunction]
fn find_invalid_tokens(content: String, tokens: Vec<String>, forbid_special: bool) -> Vec<String> {
    invalid_tokens(&content, tokens, forbid_special)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn generate_code_wasm(structure_json: &str) -> Result<String, JsValue> {
    generate_json(structure_json).map_err(|e| JsValue::from_str(&e))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn parse_code_wasm(text: &str) -> Result<String, JsValue> {
    parse_json(text).map_err(|e| JsValue::from_str(&e))
}

/// `tokens_json` is a JSON array of token strings; returns a JSON array.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn find_invalid_tokens_wasm(
    content: &str,
    tokens_json: &str,
    forbid_special: bool,
) -> Result<String, JsValue> {
    let tokens: Vec<String> =
        serde_json::from_str(tokens_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&invalid_tokens(content, tokens, forbid_special))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(not(target_arch = "wasm32"))]
#[pymodule]
fn tibasic_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(generate_code, m)?)?;
    m.add_function(wrap_pyfunction!(parse_code, m)?)?;
    m.add_function(wrap_pyfunction!(find_invalid_tokens, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn run_fixture(input_path: &str, chars_per_line: Option<usize>) {
        let golden_path = format!("{}.golden.txt", input_path);
        let input = fs::read_to_string(input_path).expect("Failed to read input");
        let golden = fs::read_to_string(golden_path).expect("Failed to read golden");
        let golden = golden.trim_end();

        let mut structure = AppStructure::from_json(&input).expect("Invalid structure json");
        if let Some(width) = chars_per_line {
            structure.settings.chars_per_line = width;
        }
        let output = generate(&structure).expect("generation failed");

        if output != golden {
            for (i, (a, b)) in output.lines().zip(golden.lines()).enumerate() {
                if a != b {
                    println!("Mismatch at line {}", i + 1);
                    println!("Got: {}", a);
                    println!("Exp: {}", b);
                    break;
                }
            }
            assert_eq!(output, golden, "Mismatch in fixture {}", input_path);
        }

        let mut reparsed = parse(golden).expect("golden text must parse");
        reparsed.settings = structure.settings;
        assert_eq!(
            generate(&reparsed).expect("regeneration failed"),
            golden,
            "Round trip changed fixture {}",
            input_path
        );
    }

    #[test]
    fn test_fixtures() {
        let fixtures_path = Path::new("fixtures/fixtures.json");
        let fixtures_text =
            fs::read_to_string(fixtures_path).expect("Failed to read fixtures.json");
        let fixtures: serde_json::Value =
            serde_json::from_str(&fixtures_text).expect("Invalid fixtures.json");
        let obj = fixtures
            .as_object()
            .expect("fixtures.json must be an object");

        for (name, cfg) in obj {
            let chars_per_line = cfg
                .get("chars_per_line")
                .and_then(|v| v.as_u64())
                .map(|v| v as usize);
            let input_path = format!("fixtures/{}", name);
            run_fixture(&input_path, chars_per_line);
        }
    }

    #[test]
    fn json_bindings_round_trip() {
        let json = r#"{"root":{"id":"root","title":"Main Menu","type":"menu","children":[
            {"id":"item-1","title":"Hello","type":"note","content":"Hi"}]},"nextId":2}"#;
        let text = generate_json(json).unwrap();
        assert!(text.starts_with("Lbl AA\n:ClrHome\n:Menu(\"Main Menu\",\"Hello\",AC,\"Quit\",AB)"));

        let back = AppStructure::from_json(&parse_json(&text).unwrap()).unwrap();
        assert_eq!(back.root.children().len(), 1);
        assert_eq!(back.root.children()[0].content(), Some("Hi"));

        assert_eq!(parse_json("Lbl AA\n:Stop").unwrap_err(), "Root menu not found");
        assert!(generate_json("not json").is_err());
    }

    #[test]
    fn invalid_tokens_binding_is_sorted() {
        let got = invalid_tokens("x ~ y ! z", vec!["->".to_string()], true);
        assert_eq!(got, vec!["!".to_string(), "~".to_string()]);
    }
}
