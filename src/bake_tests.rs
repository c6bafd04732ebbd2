use crate::{
    BakedAttachmentKind, BakedScene, Error, TransformOpKind, VisibilityKey, Warning, bake_scene,
};

const ATLAS: &str = r#"
page.png
size: 100,100

body
  xy: 10, 20
  size: 30, 40
img2
  xy: 10, 20
  size: 30, 40
"#;

fn bake(scene_json: &str) -> BakedScene {
    bake_scene(scene_json, ATLAS).unwrap()
}

fn assert_vec2(actual: [f32; 2], expected: [f32; 2]) {
    assert!(
        (actual[0] - expected[0]).abs() <= 1.0e-5 && (actual[1] - expected[1]).abs() <= 1.0e-5,
        "expected {expected:?}, got {actual:?}"
    );
}

#[test]
fn region_attachment_bakes_quad_geometry_and_uvs() {
    let baked = bake(
        r#"{
            "bones": [{ "name": "root" }],
            "slots": [{ "name": "body", "bone": "root" }],
            "skins": {
                "default": {
                    "body": { "img": { "x": 1, "y": 2, "width": 4, "height": 2 } }
                }
            }
        }"#,
    );

    assert!(baked.warnings.is_empty());
    assert_eq!(baked.attachments.len(), 1);
    let attachment = &baked.attachments[0];
    assert_eq!(attachment.kind, BakedAttachmentKind::Region);
    assert_eq!(attachment.image, "page.png");
    assert_eq!(attachment.slot, 0);

    // Offset (1, 2) plus half extents, quad order top-left first.
    assert_vec2(attachment.world_vertices[0], [-1.0, 3.0]);
    assert_vec2(attachment.world_vertices[1], [3.0, 3.0]);
    assert_vec2(attachment.world_vertices[2], [-1.0, 1.0]);
    assert_vec2(attachment.world_vertices[3], [3.0, 1.0]);

    assert_vec2(attachment.uvs[0], [0.1, 0.8]);
    assert_vec2(attachment.uvs[1], [0.4, 0.8]);
    assert_vec2(attachment.uvs[2], [0.1, 0.4]);
    assert_vec2(attachment.uvs[3], [0.4, 0.4]);

    assert_eq!(attachment.triangles, vec![[0, 1, 2], [1, 3, 2]]);
    for influences in &attachment.influences {
        assert_eq!(influences.as_slice(), &[(0usize, 1.0f32)]);
    }

    let uv_table = &baked.region_uvs;
    assert_eq!(uv_table.len(), 2);
    assert_eq!(uv_table[0].name, "body");
    assert_eq!(uv_table[0].image, "page.png");
    assert_vec2(uv_table[0].corners[0], [0.1, 0.8]);
}

#[test]
fn region_quad_follows_the_slot_bone_transform() {
    let baked = bake(
        r#"{
            "bones": [
                { "name": "root" },
                { "name": "arm", "parent": "root", "x": 10, "rotation": 90 }
            ],
            "slots": [{ "name": "body", "bone": "arm" }],
            "skins": {
                "default": {
                    "body": { "img": { "x": 1, "width": 4, "height": 2 } }
                }
            }
        }"#,
    );

    // Top-right corner (2, 1) rotated a quarter turn lands at (-1, 2); the
    // offset (1, 0) rotates to (0, 1); the bone sits at (10, 0).
    assert_vec2(baked.attachments[0].world_vertices[1], [9.0, 3.0]);
    // Local vertices ignore the bone entirely.
    assert_vec2(baked.attachments[0].local_vertices[1], [3.0, 1.0]);
}

#[test]
fn mesh_attachment_maps_uvs_through_the_atlas_region() {
    let baked = bake(
        r#"{
            "bones": [{ "name": "root" }],
            "slots": [{ "name": "body", "bone": "root" }],
            "skins": {
                "default": {
                    "body": {
                        "m": {
                            "type": "mesh",
                            "uvs": [0, 0, 1, 0, 1, 1],
                            "vertices": [0, 0, 30, 0, 30, 40],
                            "triangles": [0, 1, 2]
                        }
                    }
                }
            }
        }"#,
    );

    let mesh = &baked.attachments[0];
    assert_eq!(mesh.kind, BakedAttachmentKind::Mesh);
    assert_vec2(mesh.world_vertices[0], [0.0, 0.0]);
    assert_vec2(mesh.world_vertices[2], [30.0, 40.0]);
    assert_vec2(mesh.uvs[0], [0.1, 0.8]);
    assert_vec2(mesh.uvs[1], [0.4, 0.8]);
    assert_vec2(mesh.uvs[2], [0.4, 0.4]);
    assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
}

#[test]
fn atlas_lookup_falls_back_to_the_attachment_name() {
    let baked = bake(
        r#"{
            "bones": [{ "name": "root" }],
            "slots": [{ "name": "noatlas", "bone": "root" }],
            "skins": {
                "default": {
                    "noatlas": { "img2": { "width": 4, "height": 2 } }
                }
            }
        }"#,
    );
    assert_eq!(baked.attachments[0].name, "img2");
    assert_vec2(baked.attachments[0].uvs[0], [0.1, 0.8]);
}

#[test]
fn missing_atlas_region_is_fatal() {
    let err = bake_scene(
        r#"{
            "bones": [{ "name": "root" }],
            "slots": [{ "name": "ghost", "bone": "root" }],
            "skins": {
                "default": {
                    "ghost": { "nowhere": { "width": 4, "height": 2 } }
                }
            }
        }"#,
        ATLAS,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::MissingAtlasRegion { slot, attachment }
            if slot == "ghost" && attachment == "nowhere"
    ));
}

#[test]
fn clipping_attachment_masks_the_slot_range() {
    let baked = bake(
        r#"{
            "bones": [{ "name": "root" }],
            "slots": [
                { "name": "clip", "bone": "root" },
                { "name": "a", "bone": "root" },
                { "name": "b", "bone": "root" }
            ],
            "skins": {
                "default": {
                    "clip": {
                        "c": {
                            "type": "clipping",
                            "end": "b",
                            "vertexCount": 3,
                            "vertices": [0, 0, 1, 0, 1, 1]
                        }
                    }
                }
            }
        }"#,
    );

    assert!(baked.attachments.is_empty());
    let clip = &baked.clips[0];
    assert_eq!(clip.slot, 0);
    assert_eq!(clip.end_slot, 2);
    assert_eq!(clip.masked_slots, vec![1, 2]);
    assert_vec2(clip.world_vertices[2], [1.0, 1.0]);
}

#[test]
fn path_constraint_resolves_the_target_spline() {
    let baked = bake(
        r#"{
            "bones": [{ "name": "root" }, { "name": "rider", "parent": "root" }],
            "slots": [{ "name": "rail", "bone": "root" }],
            "path": [
                { "name": "track", "bones": ["rider"], "target": "rail" }
            ],
            "skins": {
                "default": {
                    "rail": {
                        "p": {
                            "type": "path",
                            "vertexCount": 3,
                            "vertices": [0, 0, 1, 0, 2, 0]
                        }
                    }
                }
            }
        }"#,
    );

    let path = &baked.path_constraints[0];
    assert_eq!(path.name, "track");
    assert_eq!(path.bones, vec![1]);
    assert_eq!(path.target_slot, 0);
    assert_eq!(path.nodes.len(), 1);
    let node = &path.nodes[0];
    assert_vec2(node.handle_left, [0.0, 0.0]);
    assert_vec2(node.point, [1.0, 0.0]);
    assert_vec2(node.handle_right, [2.0, 0.0]);
    assert_eq!(node.hooks.as_slice(), &[(0usize, 1.0f32)]);
}

#[test]
fn path_constraint_without_a_path_attachment_is_fatal() {
    let err = bake_scene(
        r#"{
            "bones": [{ "name": "root" }],
            "slots": [{ "name": "rail", "bone": "root" }],
            "path": [{ "name": "track", "bones": ["root"], "target": "rail" }]
        }"#,
        ATLAS,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::MissingPathAttachment { constraint, slot }
            if constraint == "track" && slot == "rail"
    ));
}

#[test]
fn constraints_resolve_into_evaluator_records() {
    let baked = bake(
        r#"{
            "bones": [
                { "name": "root" },
                { "name": "a", "parent": "root" },
                { "name": "b", "parent": "a" },
                { "name": "t", "parent": "root" }
            ],
            "ik": [
                { "name": "leg", "bones": ["a", "b"], "target": "t",
                  "mix": 0.5, "softness": 80 }
            ],
            "transform": [
                { "name": "grab", "bones": ["b"], "target": "t",
                  "mixRotate": 0.75, "mixX": -1 }
            ]
        }"#,
    );

    let ik = &baked.ik_constraints[0];
    assert_eq!(ik.chain, vec![1, 2]);
    assert_eq!(ik.target, 3);
    assert!((ik.influence - 0.25).abs() <= 1.0e-6);
    // bendPositive is omitted and defaults off, so the pole sits at +pi/2.
    assert!((ik.pole_angle_offset - std::f32::consts::FRAC_PI_2).abs() <= 1.0e-6);

    assert_eq!(baked.transform_ops.len(), 2);
    assert_eq!(
        baked.transform_ops[0].kind,
        TransformOpKind::CopyLocation { invert: true }
    );
    assert_eq!(baked.transform_ops[1].kind, TransformOpKind::CopyRotation);
    assert!((baked.transform_ops[1].influence - 0.75).abs() <= 1.0e-6);
}

#[test]
fn animation_channels_compose_over_the_setup_pose() {
    let baked = bake(
        r#"{
            "bones": [
                { "name": "root" },
                { "name": "arm", "parent": "root", "x": 5, "rotation": 90, "scaleX": 2 }
            ],
            "animations": {
                "walk": {
                    "bones": {
                        "arm": {
                            "translate": [
                                { "time": 0, "x": 2, "y": 0 },
                                { "time": 0.5, "x": 4, "y": 1 }
                            ],
                            "rotate": [{ "time": 0, "value": 90 }],
                            "scale": [{ "time": 1, "x": 3, "y": 1 }]
                        }
                    }
                }
            }
        }"#,
    );

    let animation = &baked.animations[0];
    assert_eq!(animation.name, "walk");
    let channels = &animation.bones[0];
    assert_eq!(channels.bone, 1);

    let tx = channels.translate_x.as_ref().unwrap();
    assert!((tx.keys[0].value - 7.0).abs() <= 1.0e-6);
    assert!((tx.keys[1].value - 9.0).abs() <= 1.0e-6);
    assert!((tx.keys[1].frame - 15.0).abs() <= 1.0e-6);

    let ty = channels.translate_y.as_ref().unwrap();
    assert!(ty.keys[0].value.abs() <= 1.0e-6);
    assert!((ty.keys[1].value - 1.0).abs() <= 1.0e-6);

    let rotation = channels.rotation.as_ref().unwrap();
    assert!((rotation.keys[0].value - std::f32::consts::PI).abs() <= 1.0e-6);

    let sx = channels.scale_x.as_ref().unwrap();
    assert!((sx.keys[0].value - 6.0).abs() <= 1.0e-6);
    assert!((sx.keys[0].frame - 30.0).abs() <= 1.0e-6);

    assert!((animation.frame_end - 30.0).abs() <= 1.0e-6);
}

#[test]
fn slot_visibility_and_draw_order_become_hold_keys() {
    let baked = bake(
        r#"{
            "bones": [{ "name": "root" }],
            "slots": [
                { "name": "body", "bone": "root" },
                { "name": "front", "bone": "root" }
            ],
            "animations": {
                "blink": {
                    "slots": {
                        "body": {
                            "attachment": [
                                { "time": 0, "name": "img" },
                                { "time": 1, "name": null }
                            ],
                            "rgba": [
                                { "time": 0, "color": "ffffffff" },
                                { "time": 0.5, "color": "ffffff00" }
                            ]
                        }
                    },
                    "drawOrder": [
                        { "time": 2, "offsets": [{ "slot": "front", "offset": -1 }] }
                    ]
                }
            }
        }"#,
    );

    let animation = &baked.animations[0];
    let slot = &animation.slots[0];
    assert_eq!(
        slot.visibility,
        vec![
            VisibilityKey {
                frame: 0.0,
                visible: true
            },
            VisibilityKey {
                frame: 30.0,
                visible: false
            },
        ]
    );

    let alpha = slot.alpha.as_ref().unwrap();
    assert!((alpha.keys[0].value - 1.0).abs() <= 1.0e-6);
    assert!(alpha.keys[1].value.abs() <= 1.0e-6);
    assert!((alpha.keys[1].frame - 15.0).abs() <= 1.0e-6);

    let key = &animation.draw_order[0];
    assert!((key.frame - 60.0).abs() <= 1.0e-6);
    assert_eq!(key.offsets[0].slot, 1);
    assert_eq!(key.offsets[0].offset, -1);
    assert!((animation.frame_end - 60.0).abs() <= 1.0e-6);
}

#[test]
fn warnings_from_both_inputs_aggregate_on_the_result() {
    let atlas = r#"
page.png
size: 100,100

body
  xy: 10, 20
  size: 30, 40
  rotate: 180
"#;
    let baked = bake_scene(
        r#"{
            "bones": [
                { "name": "root" },
                { "name": "bent", "parent": "root", "shearY": 5 }
            ],
            "slots": [{ "name": "body", "bone": "root" }],
            "skins": {
                "default": {
                    "body": {
                        "marker": { "type": "point" },
                        "img": { "width": 4, "height": 2 }
                    }
                }
            }
        }"#,
        atlas,
    )
    .unwrap();

    assert_eq!(
        baked.warnings,
        vec![
            Warning::UnsupportedAtlasRotation {
                region: "body".to_string(),
                degrees: 180,
            },
            Warning::ShearBone {
                bone: "bent".to_string()
            },
            Warning::UnsupportedAttachment {
                slot: "body".to_string(),
                attachment: "marker".to_string(),
                kind: "point".to_string(),
            },
        ]
    );
    // Degraded inputs still bake.
    assert_eq!(baked.attachments.len(), 1);
}

#[test]
fn hierarchy_failure_yields_no_partial_scene() {
    let result = bake_scene(
        r#"{
            "bones": [{ "name": "root" }, { "name": "stray" }]
        }"#,
        ATLAS,
    );
    assert!(matches!(result, Err(Error::Hierarchy { .. })));
}

#[test]
fn baked_bones_carry_absolute_poses() {
    let baked = bake(
        r#"{
            "bones": [
                { "name": "root" },
                { "name": "arm", "parent": "root", "x": 10, "rotation": 90, "length": 5 }
            ]
        }"#,
    );

    assert_eq!(baked.bones.len(), 2);
    let arm = &baked.bones[1];
    assert_eq!(arm.parent, Some(0));
    assert!((arm.length - 5.0).abs() <= 1.0e-6);
    assert!((arm.pose.x - 10.0).abs() <= 1.0e-6);
    assert!((arm.pose.rotation - std::f32::consts::FRAC_PI_2).abs() <= 1.0e-6);
    assert!(arm.pose.tail_dx.abs() <= 1.0e-5);
    assert!((arm.pose.tail_dy - 5.0).abs() <= 1.0e-5);
}
