use crate::model::PackedSprite;
use crate::output::AtlasOutput;
use serde_json::{Map, Value, json};

fn sprite_fields(s: &PackedSprite<f32>) -> Map<String, Value> {
    let frame = json!({"x": s.frame.x, "y": s.frame.y, "w": s.frame.w, "h": s.frame.h});
    let sprite_source_size = json!({
        "x": s.sprite_source_size.x,
        "y": s.sprite_source_size.y,
        "w": s.sprite_source_size.w,
        "h": s.sprite_source_size.h,
    });
    let source_size = json!({"w": s.source_size.w, "h": s.source_size.h});
    let mut m = Map::new();
    m.insert("frame".into(), frame);
    m.insert("rotated".into(), json!(s.rotated));
    m.insert("trimmed".into(), json!(s.trimmed));
    m.insert("spriteSourceSize".into(), sprite_source_size);
    m.insert("sourceSize".into(), source_size);
    m
}

/// Frames keyed by sprite name plus the canvas metadata.
/// Shape: `{ frames: { name: { frame, rotated, trimmed, spriteSourceSize, sourceSize } }, meta }`,
/// the TexturePacker JSON hash layout most engines read.
pub fn to_json_hash(atlas: &AtlasOutput) -> Value {
    let mut frames = Map::new();
    for s in &atlas.sprites {
        frames.insert(s.name.clone(), Value::Object(sprite_fields(s)));
    }
    json!({ "frames": frames, "meta": &atlas.metadata })
}

/// Same data with frames as an ordered array carrying a `filename` field.
pub fn to_json_array(atlas: &AtlasOutput) -> Value {
    let frames: Vec<Value> = atlas
        .sprites
        .iter()
        .map(|s| {
            let mut m = Map::new();
            m.insert("filename".into(), json!(s.name));
            m.extend(sprite_fields(s));
            Value::Object(m)
        })
        .collect();
    json!({ "frames": frames, "meta": &atlas.metadata })
}
