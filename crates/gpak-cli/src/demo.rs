use std::path::Path;

use gpak_binarizer::{Binarizer, BinarizerConfig, ObjectHandle, OpcodeStream, SaveObject, SaveReport};
use gpak_store::FileSink;
use gpak_tables::TableBuilder;
use gpak_types::{CompressionType, Guid, ResourceKey};

fn vector3(x: f32, y: f32, z: f32) -> anyhow::Result<SaveObject> {
    let mut s = OpcodeStream::new();
    for (name, value) in [("x", x), ("y", y), ("z", z)] {
        s.property("Vector3", name, "float").block(&value.to_ne_bytes());
    }
    Ok(SaveObject::new("Vector3", s.finish()?))
}

/// Objects of the sample scene: a transform, a mesh with a deferred vertex
/// buffer and an external texture, and a node linking them.
pub fn scene(binarizer: &Binarizer) -> anyhow::Result<Vec<SaveObject>> {
    let vertices: Vec<u8> = (0..3 * 1024u32)
        .flat_map(|i| ((i % 97) as f32).to_ne_bytes())
        .collect();
    let texture = ResourceKey::new("Texture", Guid::from_hex("0000000100000002000000030000000a")?);

    let mut mesh = OpcodeStream::new();
    mesh.property("Mesh", "vertices", "buffer")
        .deferred_buffer(binarizer.deferred_buffer(&vertices)?)
        .property("Mesh", "albedo", "Texture")
        .resource(texture)
        .property("Mesh", "label", "bytes")
        .inline_buffer(b"demo mesh");

    let mut node = OpcodeStream::new();
    node.property("Node", "name", "name").name("root");
    node.property("Node", "children", "array");
    node.begin_skip();
    node.number(2);
    node.object(Some(ObjectHandle(0))).object(Some(ObjectHandle(1)));
    node.end_skip();
    node.property("Node", "parent", "Node").object(None);

    Ok(vec![
        vector3(0.0, 1.0, 0.0)?,
        SaveObject::new("Mesh", mesh.finish()?),
        SaveObject::new("Node", node.finish()?),
    ])
}

pub fn write_demo(out: &Path) -> anyhow::Result<SaveReport> {
    let binarizer = Binarizer::new(BinarizerConfig {
        compression: CompressionType::Zstd,
    });
    let objects = scene(&binarizer)?;
    let mut sink = FileSink::create(out)?;
    let report = binarizer.save(TableBuilder::new(), &objects, &mut sink)?;
    sink.sync()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpak_loader::{Container, GraphCollector, LoadConfig, Loader, ValidationConfig};

    #[test]
    fn demo_container_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.gpak");
        let report = write_demo(&path).unwrap();
        assert_eq!(report.objects.len(), 3);

        let container = Container::open(&path, &ValidationConfig::default()).unwrap();
        let mut collector = GraphCollector::new();
        let loaded = Loader::new(&container, LoadConfig::default())
            .load(&mut collector)
            .unwrap();
        assert_eq!(loaded.objects, 3);
        assert_eq!(loaded.buffers_fetched, 1);
        assert_eq!(loaded.dependencies.len(), 1);
        assert_eq!(collector.objects()[2].class, "Node");
    }
}
