use super::*;
use crate::eval::plan::FramePlan;
use crate::foundation::error::{BackendError, BackendResult, NglError};
use crate::render::backend::{BackendKind, SurfaceConfig};

/// Backend that fills every frame with one byte value, or fails reads on demand.
struct FillBackend {
    value: u8,
    fail_reads: bool,
}

impl Backend for FillBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Auto
    }
    fn initialize(&mut self, _cfg: &SurfaceConfig) -> BackendResult<()> {
        Ok(())
    }
    fn resize(&mut self, _width: u32, _height: u32) -> BackendResult<()> {
        Ok(())
    }
    fn evaluate_graph(&mut self, _plan: &FramePlan) -> BackendResult<()> {
        Ok(())
    }
    fn present(&mut self, _pts: Option<f64>) -> BackendResult<()> {
        Ok(())
    }
    fn read_pixels(&mut self, dst: &mut [u8]) -> BackendResult<()> {
        if self.fail_reads {
            dst[0] = 0xee;
            return Err(BackendError::failed("read failed"));
        }
        dst.fill(self.value);
        Ok(())
    }
    fn release(&mut self) {}
}

#[test]
fn bind_rejects_wrong_capacity_and_keeps_previous() {
    let size = SurfaceSize::new(2, 2);
    let mut p = CapturePipeline::new();
    let good = CaptureBuffer::for_size(2, 2);
    p.bind(good.clone(), size).unwrap();

    let err = p.bind(CaptureBuffer::new(15), size).unwrap_err();
    assert_eq!(
        err,
        CaptureError::CapacityMismatch {
            expected: 16,
            actual: 15
        }
    );
    assert!(p.buffer().unwrap().same_buffer(&good));
}

#[test]
fn copy_writes_through_shared_handle() {
    let size = SurfaceSize::new(2, 1);
    let host = CaptureBuffer::for_size(2, 1);
    let mut p = CapturePipeline::new();
    p.bind(host.clone(), size).unwrap();

    let mut backend = FillBackend {
        value: 7,
        fail_reads: false,
    };
    assert!(p.copy_from(&mut backend, size).unwrap());
    assert_eq!(host.to_vec().unwrap(), vec![7; 8]);
}

#[test]
fn failed_read_leaves_buffer_untouched() {
    let size = SurfaceSize::new(1, 1);
    let host = CaptureBuffer::from_vec(vec![1, 2, 3, 4]);
    let mut p = CapturePipeline::new();
    p.bind(host.clone(), size).unwrap();

    let mut backend = FillBackend {
        value: 9,
        fail_reads: true,
    };
    let err = p.copy_from(&mut backend, size).unwrap_err();
    assert!(matches!(err, NglError::Backend(_)));
    assert_eq!(host.to_vec().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn resize_unbinds_only_on_change() {
    let mut p = CapturePipeline::new();
    p.bind(CaptureBuffer::for_size(4, 4), SurfaceSize::new(4, 4))
        .unwrap();
    p.on_resize(SurfaceSize::new(4, 4));
    assert!(p.is_bound());
    p.on_resize(SurfaceSize::new(8, 4));
    assert!(!p.is_bound());
}

#[test]
fn unbound_pipeline_skips_copy() {
    let mut p = CapturePipeline::new();
    let mut backend = FillBackend {
        value: 0,
        fail_reads: true,
    };
    assert!(!p.copy_from(&mut backend, SurfaceSize::new(1, 1)).unwrap());
}

#[test]
fn pixel_lookup() {
    let buf = CaptureBuffer::from_vec((0u8..16).collect());
    assert_eq!(buf.pixel(2, 1, 1).unwrap(), Some([12, 13, 14, 15]));
    assert_eq!(buf.pixel(2, 0, 2).unwrap(), None);
}
