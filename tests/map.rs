extern crate byteorder;
extern crate nalgebra;
extern crate oatrender;

use byteorder::{LittleEndian, WriteBytesExt};
use nalgebra::{Matrix4, Vector3};

use oatrender::interpolate::Slope;
use oatrender::map::{Map, Point, PointSlope};
use oatrender::mesh::Primitive;
use oatrender::pixel::PixelRgba32;

fn push_f32s(data: &mut Vec<u8>, values: &[f32]) {
    for value in values {
        data.write_f32::<LittleEndian>(*value).unwrap();
    }
}

/// One 2x2 texture and one triangle-list model with three points.
fn fixture() -> Vec<u8> {
    let mut data = Vec::new();

    data.write_u32::<LittleEndian>(1).unwrap(); // texture count
    data.write_u32::<LittleEndian>(1).unwrap(); // model count

    // texture: 2x2, red / green / blue / white
    data.write_u32::<LittleEndian>(2).unwrap();
    data.write_u32::<LittleEndian>(2).unwrap();
    for rgba in &[[255u8, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [255, 255, 255, 255]] {
        data.extend_from_slice(rgba);
    }

    // model header: triangle list, 3 points, 3 indices
    data.write_u32::<LittleEndian>(0).unwrap();
    data.write_u32::<LittleEndian>(3).unwrap();
    data.write_u32::<LittleEndian>(3).unwrap();

    // translation, scale, rotation
    push_f32s(&mut data, &[1.0, 2.0, 3.0]);
    push_f32s(&mut data, &[1.0, 1.0, 1.0]);
    push_f32s(&mut data, &[0.0, 0.0, 0.0]);

    // points: texture index, uv, color, position
    for i in 0..3u32 {
        data.write_u32::<LittleEndian>(1).unwrap();
        push_f32s(&mut data, &[0.25 * i as f32, 0.5]);
        push_f32s(&mut data, &[1.0, 0.5, 0.25]);
        push_f32s(&mut data, &[i as f32, 0.0, 1.0, 1.0]);
    }

    for index in 0..3u32 {
        data.write_u32::<LittleEndian>(index).unwrap();
    }

    data
}

#[test]
fn map_loads_textures_and_models() {
    let data = fixture();
    let map = Map::load(&mut &data[..]).unwrap();

    // Bank slot zero is the implicit null texture.
    assert_eq!(map.textures().len(), 2);
    let null = map.texture(0).unwrap();
    assert_eq!((null.width(), null.height()), (1, 1));
    assert_eq!(*null.at(0, 0).unwrap(), PixelRgba32::default());

    let texture = map.texture(1).unwrap();
    assert_eq!((texture.width(), texture.height()), (2, 2));
    assert_eq!(*texture.at(0, 0).unwrap(), PixelRgba32::new(255, 0, 0, 255));
    assert_eq!(*texture.at(1, 1).unwrap(), PixelRgba32::new(255, 255, 255, 255));

    assert_eq!(map.models().len(), 1);
    assert!(map.texture(2).is_none());
}

#[test]
fn model_carries_its_geometry_and_transform() {
    let data = fixture();
    let map = Map::load(&mut &data[..]).unwrap();
    let model = &map.models()[0];

    assert_eq!(model.points().len(), 3);
    assert_eq!(model.indices(), &[0, 1, 2]);

    let point = &model.points()[1];
    assert_eq!(point.texture_index, 1);
    assert_eq!(point.sampler.x, 0.25);
    assert_eq!(point.position.x, 1.0);

    // Identity scale and rotation leave a pure translation.
    assert_eq!(model.transformation(),
               Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0)));

    let mesh = model.mesh().unwrap();
    assert_eq!(mesh.primitive(), Primitive::TriangleList);
}

#[test]
fn point_slope_interpolates_attributes_but_not_texture() {
    let data = fixture();
    let map = Map::load(&mut &data[..]).unwrap();

    let a = map.models()[0].points()[0].clone();
    let b = map.models()[0].points()[2].clone();
    let middle = PointSlope::new(a.clone(), b.clone()).at(0.5);

    assert_eq!(middle.texture_index, a.texture_index);
    assert_eq!(middle.sampler.x, 0.25);
    assert_eq!(middle.position.x, 1.0);
    assert_eq!(middle.color, a.color);
}

#[test]
fn truncated_stream_fails_to_load() {
    let data = fixture();

    // Cutting anywhere inside the stream must produce an error rather
    // than a half-initialized map.
    for len in &[0, 4, 8, 13, 60, data.len() - 2] {
        assert!(Map::load(&mut &data[..*len]).is_err(),
                "truncation at {} bytes should fail", len);
    }
}

#[test]
fn invalid_primitive_mode_is_rejected_at_mesh_time() {
    let mut data = Vec::new();
    data.write_u32::<LittleEndian>(0).unwrap(); // no textures
    data.write_u32::<LittleEndian>(1).unwrap(); // one model

    data.write_u32::<LittleEndian>(7).unwrap(); // bogus assembly mode
    data.write_u32::<LittleEndian>(0).unwrap();
    data.write_u32::<LittleEndian>(0).unwrap();
    push_f32s(&mut data, &[0.0; 9]);

    let map = Map::load(&mut &data[..]).unwrap();
    assert!(map.models()[0].mesh().is_err());
}
