//! JSON bodies exchanged with the puzzle service.
//!
//! Grid cells are passed through untouched: the client never interprets
//! tile semantics, it only stores and renders what the service returns.

use serde::{Deserialize, Serialize};

/// Row-major grid snapshot as returned by the service
pub type Grid = Vec<Vec<serde_json::Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRequest<'a> {
    pub session_id: &'a str,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest<'a> {
    pub session_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub session_id: String,
    pub grid: Grid,
    pub start: Option<Position>,
    pub end: Option<Position>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SelectResponse {
    #[serde(default)]
    pub moves: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RotateResponse {
    pub grid: Grid,
    #[serde(default)]
    pub rotations: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlipResponse {
    pub grid: Grid,
    #[serde(default)]
    pub flips: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitResponse {
    pub valid: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub path: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsAck {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One line of the results upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub game: String,
    pub round_index: usize,
    pub correct: u32,
    pub incorrect: u32,
    pub net_score: i64,
    pub elapsed_seconds: f64,
    pub completed_before_timeout: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsPayload {
    pub scores: Vec<ScoreRecord>,
}

/// Single character used to draw a cell. Strings contribute their first
/// character, objects their `type`/`kind`/`symbol` field when present.
pub fn tile_glyph(tile: &serde_json::Value) -> char {
    use serde_json::Value;
    match tile {
        Value::String(s) => s.chars().next().unwrap_or('·'),
        Value::Number(n) => n
            .as_u64()
            .and_then(|d| char::from_digit((d % 10) as u32, 10))
            .unwrap_or('#'),
        Value::Bool(true) => '■',
        Value::Bool(false) | Value::Null => '·',
        Value::Object(map) => ["symbol", "type", "kind"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .and_then(|s| s.chars().next())
            .unwrap_or('?'),
        Value::Array(_) => '?',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_response_decodes() {
        let body = json!({
            "sessionId": "abc",
            "grid": [["L", "T"], ["I", "L"]],
            "start": {"row": 0, "col": 0},
            "end": {"row": 1, "col": 1},
            "status": "active"
        });
        let resp: StartResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.session_id, "abc");
        assert_eq!(resp.grid.len(), 2);
        assert_eq!(resp.end, Some(Position::new(1, 1)));
    }

    #[test]
    fn test_counters_are_optional() {
        let rotate: RotateResponse = serde_json::from_value(json!({"grid": []})).unwrap();
        assert_eq!(rotate.rotations, None);
        let select: SelectResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(select.moves, None);
    }

    #[test]
    fn test_cell_request_uses_camel_case() {
        let body = serde_json::to_value(CellRequest {
            session_id: "s1",
            row: 2,
            col: 3,
        })
        .unwrap();
        assert_eq!(body, json!({"sessionId": "s1", "row": 2, "col": 3}));
    }

    #[test]
    fn test_rejected_submit_has_empty_path() {
        let resp: SubmitResponse =
            serde_json::from_value(json!({"valid": false, "status": "incomplete"})).unwrap();
        assert!(!resp.valid);
        assert!(resp.path.is_empty());
    }

    #[test]
    fn test_tile_glyphs() {
        assert_eq!(tile_glyph(&json!("╋")), '╋');
        assert_eq!(tile_glyph(&json!(7)), '7');
        assert_eq!(tile_glyph(&json!({"type": "corner", "rotation": 90})), 'c');
        assert_eq!(tile_glyph(&json!(null)), '·');
    }
}
