use siamtrack::{
    correlate, upsample, BoundingBox, FrameView, OwnedFrame, ResponseCalibration, ResponseMap,
    ScalePyramid, SearchGeometry, SiamTrackError, Tensor4, TrackerConfig, UpsampleMethod,
};

#[test]
fn frame_view_rejects_invalid_dimensions() {
    let data = [0.0f32; 12];
    let err = FrameView::new(&data, 0, 2, 3).err().unwrap();
    assert_eq!(
        err,
        SiamTrackError::InvalidDimensions {
            height: 0,
            width: 2,
            channels: 3,
        }
    );
    let err = OwnedFrame::new(vec![0.0; 5], 2, 1, 3).err().unwrap();
    assert_eq!(err, SiamTrackError::BufferTooSmall { needed: 6, got: 5 });
}

#[test]
fn pyramid_exponents_sum_to_zero_for_odd_counts() {
    for n in (1..16).step_by(2) {
        let pyramid = ScalePyramid::new(n, 1.05).unwrap();
        assert_eq!(pyramid.exponents().iter().sum::<i32>(), 0);
        let center = pyramid.factors().nth(pyramid.center_index()).unwrap();
        assert_eq!(center, 1.0);
    }
}

#[test]
fn base_scales_are_positive_for_many_boxes() {
    let cfg = TrackerConfig::default();
    for (h, w) in [(1.0f32, 1.0f32), (3.0, 200.0), (60.0, 120.0), (500.0, 7.5)] {
        let bbox = BoundingBox::new(50.0, 60.0, h, w);
        let geo = SearchGeometry::resolve(&bbox, 120, 140, &cfg).unwrap();
        assert!(geo.base_scale_z > 0.0 && geo.base_scale_x > 0.0);
        assert!(geo.scale_factors.iter().all(|&s| s > 0.0 && s.is_finite()));
    }
}

#[test]
fn config_rejects_unknown_upsample_method_name() {
    let err = "nearest".parse::<UpsampleMethod>().unwrap_err();
    assert_eq!(
        err,
        SiamTrackError::UnsupportedUpsampleMethod {
            name: "nearest".to_string()
        }
    );
    assert_eq!(err.to_string(), "unsupported upsample method: nearest");
}

#[test]
fn correlation_size_follows_valid_mode() {
    for (h, w, th, tw) in [(22usize, 22usize, 6usize, 6usize), (9, 13, 4, 2), (5, 5, 5, 5)] {
        let search = Tensor4::zeros([2, h, w, 3]).unwrap();
        let templates = Tensor4::zeros([2, th, tw, 3]).unwrap();
        let map = correlate(&search, &templates, ResponseCalibration::default()).unwrap();
        assert_eq!(map.shape(), [2, h - th + 1, w - tw + 1]);
    }
}

#[test]
fn upsample_keeps_corners_for_random_surfaces() {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let data: Vec<f32> = (0..3 * 17 * 17).map(|_| rng.random_range(-1.0..1.0)).collect();
    let map = ResponseMap::from_vec(data, 3, 17, 17).unwrap();
    for method in [UpsampleMethod::Bilinear, UpsampleMethod::Bicubic] {
        let up = upsample(&map, 16, method).unwrap();
        for s in 0..3 {
            assert_eq!(up.corners(s), map.corners(s));
        }
    }
}
