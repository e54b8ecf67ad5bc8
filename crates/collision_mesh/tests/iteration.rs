use collision_mesh::key::{decode_mesh_key, decode_primitive_key, encode_mesh_key};
use collision_mesh::{MeshData, MeshSettings, PolygonCollider, Section, StagedSection, Vec3};

fn square() -> Vec<Vec3> {
    vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, 1.0),
    ]
}

fn walk(data: &MeshData) -> Vec<u32> {
    let mesh = data.as_mesh();
    let mut polygon = PolygonCollider::new();
    let mut keys = Vec::new();
    let mut key = mesh.get_first_polygon(&mut polygon);
    while let Some(k) = key {
        keys.push(k);
        key = mesh.get_next_polygon(k, &mut polygon);
    }
    keys
}

#[test]
fn visits_triangles_then_both_pair_halves() -> anyhow::Result<()> {
    let mut triangles = StagedSection::with_vertices(square());
    triangles.push_triangle(0, 1, 2);
    triangles.push_triangle(0, 2, 3);
    let mut pair = StagedSection::with_vertices(square());
    pair.push_triangle_pair(0, 1, 2, 3);

    let data = MeshData::build(&[], &[triangles, pair], &MeshSettings::default())?;
    let keys = walk(&data);
    assert_eq!(
        keys,
        vec![
            encode_mesh_key(0, 0, 0),
            encode_mesh_key(0, 1, 0),
            encode_mesh_key(1, 0, 0),
            encode_mesh_key(1, 0, 1),
        ]
    );

    let last = *keys.last().unwrap();
    let mut polygon = PolygonCollider::new();
    assert_eq!(data.as_mesh().get_next_polygon(last, &mut polygon), None);
    Ok(())
}

#[test]
fn quads_are_a_single_polygon() -> anyhow::Result<()> {
    let mut section = StagedSection::with_vertices(square());
    section.push_quad(0, 1, 2, 3);
    section.push_triangle(0, 1, 2);

    let data = MeshData::build(&[], &[section], &MeshSettings::default())?;
    let polygons: Vec<_> = data.as_mesh().polygons().collect();
    assert_eq!(polygons.len(), 2);
    assert_eq!(polygons[0].0, encode_mesh_key(0, 0, 0));
    assert!(polygons[0].1.is_quad());
    assert_eq!(polygons[1].0, encode_mesh_key(0, 1, 0));
    assert!(polygons[1].1.is_triangle());
    Ok(())
}

#[test]
fn first_polygon_is_stable() -> anyhow::Result<()> {
    let mut section = StagedSection::with_vertices(square());
    section.push_triangle_pair(0, 1, 2, 3);
    let data = MeshData::build(&[], &[section], &MeshSettings::default())?;
    let mesh = data.as_mesh();

    let mut first = PolygonCollider::new();
    let mut again = PolygonCollider::new();
    let key = mesh.get_first_polygon(&mut first);
    let _ = mesh.get_next_polygon(0, &mut again);
    assert_eq!(mesh.get_first_polygon(&mut again), key);
    assert_eq!(first, again);
    assert_eq!(key, Some(0));
    Ok(())
}

#[test]
fn walk_crosses_full_sections() -> anyhow::Result<()> {
    let vertices: Vec<Vec3> = (0..u16::try_from(Section::MAX_NUM_VERTICES)?)
        .map(|i| Vec3::new(f32::from(i), 0.0, 0.0))
        .collect();
    let mut full = StagedSection::with_vertices(vertices);
    for i in 0..Section::MAX_NUM_PRIMITIVES {
        let a = u8::try_from(i)?;
        full.push_triangle(a, a.wrapping_add(1), a.wrapping_add(2));
    }
    let mut tail = StagedSection::with_vertices(square());
    tail.push_triangle_pair(0, 1, 2, 3);

    let data = MeshData::build(&[], &[full.clone(), full, tail], &MeshSettings::default())?;
    let keys = walk(&data);
    assert_eq!(keys.len(), 2 * 256 + 2);
    assert!(keys.windows(2).all(|w| w[0] < w[1]), "keys must increase");

    let (primitive_key, polygon_index) = decode_mesh_key(keys[255]);
    assert_eq!(decode_primitive_key(primitive_key), (0, 255));
    assert_eq!(polygon_index, 0);
    assert_eq!(keys[256], encode_mesh_key(1, 0, 0));
    assert_eq!(keys[512..], [encode_mesh_key(2, 0, 0), encode_mesh_key(2, 0, 1)]);
    Ok(())
}

#[test]
fn iterator_matches_key_protocol() -> anyhow::Result<()> {
    let mut a = StagedSection::with_vertices(square());
    a.push_triangle_pair(0, 1, 2, 3);
    a.push_quad(0, 1, 2, 3);
    let mut b = StagedSection::with_vertices(square());
    b.push_triangle(1, 2, 3);
    let data = MeshData::build(&[], &[a, b], &MeshSettings::default())?;
    let mesh = data.as_mesh();

    let mut iter = mesh.polygons();
    let from_iter: Vec<u32> = iter.by_ref().map(|(key, _)| key).collect();
    assert_eq!(from_iter, walk(&data));
    assert!(iter.next().is_none());

    for (key, polygon) in mesh.polygons() {
        let mut expected = PolygonCollider::new();
        assert!(mesh.get_polygon(key, &polygon.filter, &mut expected));
        assert_eq!(polygon, expected);
    }
    Ok(())
}
