use collision_mesh::key::{encode_mesh_key, encode_primitive_key};
use collision_mesh::{
    BvhNode, ColliderKey, CollisionFilter, Material, MeshData, MeshSettings, PolygonCollider,
    PrimitiveFlags, StagedSection, Vec3,
};

const A: Vec3 = Vec3::new(0.0, 0.0, 0.0);
const B: Vec3 = Vec3::new(1.0, 0.0, 0.0);
const C: Vec3 = Vec3::new(1.0, 0.0, 1.0);
const D: Vec3 = Vec3::new(0.0, 0.0, 1.0);

fn square() -> Vec<Vec3> {
    vec![A, B, C, D]
}

fn single_primitive_mesh(
    push: impl FnOnce(&mut StagedSection),
    settings: &MeshSettings,
) -> MeshData {
    let mut section = StagedSection::with_vertices(square());
    push(&mut section);
    MeshData::build(&[], &[section], settings).unwrap()
}

#[test]
fn key_bits_follow_section_count() -> anyhow::Result<()> {
    for (num_sections, expected_bits) in [(1, 9), (2, 10), (3, 11), (256, 17)] {
        let mut section = StagedSection::with_vertices(square());
        section.push_triangle(0, 1, 2);
        let sections = vec![section; num_sections];
        let data = MeshData::build(&[], &sections, &MeshSettings::default())?;
        let bits = data.as_mesh().num_collider_key_bits();
        assert_eq!(bits, expected_bits, "{num_sections} sections");
    }
    Ok(())
}

#[test]
fn triangle_pair_shares_diagonal() {
    let data = single_primitive_mesh(
        |s| {
            s.push_triangle_pair(0, 1, 2, 3);
        },
        &MeshSettings::default(),
    );
    let mesh = data.as_mesh();
    let mut polygon = PolygonCollider::new();

    assert!(mesh.get_polygon(encode_mesh_key(0, 0, 0), &CollisionFilter::DEFAULT, &mut polygon));
    assert_eq!(polygon.vertices(), &[A, B, C]);

    assert!(mesh.get_polygon(encode_mesh_key(0, 0, 1), &CollisionFilter::DEFAULT, &mut polygon));
    assert_eq!(polygon.vertices(), &[A, C, D]);
}

#[test]
fn quad_decomposes_like_a_pair() {
    let data = single_primitive_mesh(
        |s| {
            s.push_quad(0, 1, 2, 3);
        },
        &MeshSettings::default(),
    );
    let mut quad = PolygonCollider::new();
    assert!(data
        .as_mesh()
        .get_polygon(encode_mesh_key(0, 0, 0), &CollisionFilter::DEFAULT, &mut quad));
    assert!(quad.is_quad());
    assert_eq!(quad.vertices(), &[A, B, C, D]);
    assert_eq!(quad.fan_triangle(0), Some([A, B, C]));
    assert_eq!(quad.fan_triangle(1), Some([A, C, D]));
}

#[test]
fn filtered_primitive_leaves_polygon_untouched() {
    let settings = MeshSettings {
        filter: CollisionFilter {
            belongs_to: 0b01,
            collides_with: 0b01,
            group_index: 0,
        },
        material: Material {
            friction: 0.9,
            ..Material::default()
        },
    };
    let data = single_primitive_mesh(
        |s| {
            s.push_triangle(0, 1, 2);
        },
        &settings,
    );
    let mesh = data.as_mesh();

    let mut polygon =
        PolygonCollider::quad(D, C, B, A, CollisionFilter::ZERO, Material::default());
    let before = polygon;
    let other_layer = CollisionFilter {
        belongs_to: 0b10,
        collides_with: 0b10,
        group_index: 0,
    };
    assert!(!mesh.get_polygon(0, &other_layer, &mut polygon));
    assert_eq!(polygon, before);

    assert!(mesh.get_polygon(0, &CollisionFilter::DEFAULT, &mut polygon));
    assert_eq!(polygon.vertices(), &[A, B, C]);
    assert_eq!(polygon.material, settings.material);
    assert_eq!(polygon.filter, settings.filter);
}

#[test]
fn primitive_reads_back_staged_values() -> anyhow::Result<()> {
    let odd = [
        Vec3::new(-0.0, f32::from_bits(0x7fc0_0001), f32::MIN_POSITIVE / 2.0),
        Vec3::new(1.5, -2.25, 1e30),
        Vec3::new(f32::INFINITY, 3.0, -7.0),
        Vec3::new(0.1, 0.2, 0.3),
    ];
    let mut section = StagedSection::with_vertices(odd.to_vec());
    section.push_triangle(3, 2, 1);
    section.push_quad(0, 1, 2, 3);
    let settings = MeshSettings {
        filter: CollisionFilter {
            belongs_to: 7,
            collides_with: 3,
            group_index: 2,
        },
        material: Material {
            restitution: 0.4,
            custom_tags: 9,
            ..Material::default()
        },
    };
    let data = MeshData::build(&[], &[section], &settings)?;
    let mesh = data.as_mesh();

    let triangle = mesh.get_primitive(encode_primitive_key(0, 0));
    assert_eq!(triangle.flags, PrimitiveFlags::IS_TRIANGLE);
    assert_eq!(triangle.filter, settings.filter);
    let expected = [odd[3], odd[2], odd[1], odd[1]];
    assert!(triangle.vertices.iter().zip(&expected).all(|(a, b)| a.bits_eq(*b)));

    let (quad, material) = mesh.get_primitive_with_material(encode_primitive_key(0, 1));
    assert_eq!(mesh.get_primitive_flags(encode_primitive_key(0, 1)), PrimitiveFlags::IS_QUAD);
    assert_eq!(quad.flags, PrimitiveFlags::IS_QUAD);
    assert!(quad.vertices.iter().zip(&odd).all(|(a, b)| a.bits_eq(*b)));
    assert_eq!(material.restitution.to_bits(), settings.material.restitution.to_bits());
    assert_eq!(material.custom_tags, 9);
    Ok(())
}

#[test]
fn sections_expose_single_entry_tables() -> anyhow::Result<()> {
    let mut section = StagedSection::with_vertices(square());
    section.push_triangle(0, 1, 2);
    section.push_triangle_pair(0, 1, 2, 3);
    let data = MeshData::build(&[], &[section.clone(), section], &MeshSettings::default())?;
    let sections = data.as_mesh().sections();
    assert_eq!(sections.len(), 2);
    for section in sections.iter() {
        assert_eq!(section.num_primitives(), 2);
        assert_eq!(section.vertices(), square().as_slice());
        assert_eq!(section.filters(), &[CollisionFilter::DEFAULT]);
        assert_eq!(section.materials(), &[Material::default()]);
        assert_eq!(section.primitive_filter_indices(), &[0, 0]);
        assert_eq!(section.primitive_material_indices(), &[0, 0]);
    }
    Ok(())
}

#[test]
fn bvh_nodes_are_stored_verbatim() -> anyhow::Result<()> {
    let mut nodes = [BvhNode::default(); 3];
    nodes[1].data = [2, 0, 0, 0];
    nodes[1].bounds.hx = [1.0; 4];
    nodes[2].flags = BvhNode::LEAF;
    nodes[2].data = [0, 1, -1, -1];

    let mut section = StagedSection::with_vertices(square());
    section.push_triangle(0, 1, 2);
    section.push_triangle(0, 2, 3);
    let data = MeshData::build(&nodes, &[section], &MeshSettings::default())?;
    let bvh = data.as_mesh().bounding_volume_hierarchy();
    assert_eq!(bvh.len(), 3);
    assert_eq!(bvh.nodes(), &nodes);
    assert!(bvh.root().is_some_and(BvhNode::is_internal));
    assert!(bvh.nodes()[2].is_leaf());
    Ok(())
}

#[test]
fn mesh_key_travels_inside_collider_key() -> anyhow::Result<()> {
    let mut section = StagedSection::with_vertices(square());
    section.push_triangle_pair(0, 1, 2, 3);
    let sections = [section.clone(), section.clone(), section];
    let data = MeshData::build(&[], &sections, &MeshSettings::default())?;
    let mesh = data.as_mesh();
    let bits = mesh.num_collider_key_bits();

    for (mesh_key, _) in mesh.polygons() {
        let mut key = ColliderKey::new(bits, mesh_key);
        assert_eq!(key.pop_sub_key(bits), Some(mesh_key));
        assert!(key.is_empty());
    }
    Ok(())
}

#[test]
fn concurrent_readers_agree() -> anyhow::Result<()> {
    let mut section = StagedSection::with_vertices(square());
    section.push_triangle_pair(0, 1, 2, 3);
    section.push_quad(0, 1, 2, 3);
    let data = MeshData::build(&[], &vec![section; 8], &MeshSettings::default())?;
    let expected: Vec<_> = data.as_mesh().polygons().collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| data.as_mesh().polygons().collect::<Vec<_>>()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
    Ok(())
}
