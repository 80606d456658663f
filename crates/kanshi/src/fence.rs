//! Virtual fence editing
//!
//! The editor works on a copy of one camera's fences. Point drags go to a
//! staged buffer; nothing reaches the configuration until [`FenceEditor::commit`].

use thiserror::Error;
use tracing::info;

use crate::camera::{CameraConfig, FencePoint, VirtualFence};
use crate::config::{ConfigReconciler, SaveOutcome};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenceError {
    #[error("no fence at index {0}")]
    NoSuchFence(usize),
    #[error("no point at index {0}")]
    NoSuchPoint(usize),
    #[error("no fence is being edited")]
    NotEditing,
    #[error("camera {0} no longer exists")]
    UnknownCamera(String),
}

impl VirtualFence {
    /// Ray-casting point-in-polygon test in normalized coordinates.
    ///
    /// Fences with fewer than three points contain nothing.
    pub fn contains(&self, p: FencePoint) -> bool {
        let pts = &self.points;
        if pts.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = pts.len() - 1;
        for i in 0..pts.len() {
            let (a, b) = (pts[i], pts[j]);
            if (a.y > p.y) != (b.y > p.y) {
                let dy = if b.y - a.y == 0.0 { 1e-9 } else { b.y - a.y };
                if p.x < (b.x - a.x) * (p.y - a.y) / dy + a.x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Whether a detection of `class_name` centred at `p` falls in this zone
    pub fn triggers(&self, class_name: &str, p: FencePoint) -> bool {
        self.enabled
            && self
                .detect_objects
                .iter()
                .any(|o| o.eq_ignore_ascii_case(class_name))
            && self.contains(p)
    }
}

/// Staged polygon edits for one camera
#[derive(Debug, Clone)]
pub struct FenceEditor {
    camera_id: String,
    fences: Vec<VirtualFence>,
    /// Fence being edited and its working point buffer
    staged: Option<(usize, Vec<FencePoint>)>,
}

impl FenceEditor {
    pub fn new(camera: &CameraConfig) -> Self {
        Self {
            camera_id: camera.id.clone(),
            fences: camera.fences().to_vec(),
            staged: None,
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn fences(&self) -> &[VirtualFence] {
        &self.fences
    }

    /// Points to draw for `index`: the staged buffer while it's being edited
    pub fn points(&self, index: usize) -> Option<&[FencePoint]> {
        match &self.staged {
            Some((i, buf)) if *i == index => Some(buf),
            _ => self.fences.get(index).map(|f| f.points.as_slice()),
        }
    }

    pub fn editing(&self) -> Option<usize> {
        self.staged.as_ref().map(|(i, _)| *i)
    }

    /// Start editing a fence. Any other staged edit is discarded.
    pub fn begin_edit(&mut self, index: usize) -> Result<(), FenceError> {
        let fence = self.fences.get(index).ok_or(FenceError::NoSuchFence(index))?;
        self.staged = Some((index, fence.points.clone()));
        Ok(())
    }

    fn buffer(&mut self) -> Result<&mut Vec<FencePoint>, FenceError> {
        self.staged
            .as_mut()
            .map(|(_, buf)| buf)
            .ok_or(FenceError::NotEditing)
    }

    /// Move one staged point, clamped to the frame
    pub fn drag_point(&mut self, point: usize, to: FencePoint) -> Result<(), FenceError> {
        let buf = self.buffer()?;
        let slot = buf.get_mut(point).ok_or(FenceError::NoSuchPoint(point))?;
        *slot = to.clamped();
        Ok(())
    }

    pub fn add_point(&mut self, p: FencePoint) -> Result<(), FenceError> {
        self.buffer()?.push(p.clamped());
        Ok(())
    }

    pub fn remove_point(&mut self, point: usize) -> Result<FencePoint, FenceError> {
        let buf = self.buffer()?;
        if point >= buf.len() {
            return Err(FenceError::NoSuchPoint(point));
        }
        Ok(buf.remove(point))
    }

    /// Drop the staged buffer
    pub fn cancel(&mut self) {
        self.staged = None;
    }

    /// Append an empty fence and start editing it
    pub fn add_fence(&mut self, name: &str, detect_objects: Vec<String>) -> usize {
        self.fences.push(VirtualFence {
            name: name.to_string(),
            points: Vec::new(),
            enabled: true,
            detect_objects,
        });
        let index = self.fences.len() - 1;
        self.staged = Some((index, Vec::new()));
        index
    }

    pub fn remove_fence(&mut self, index: usize) -> Result<VirtualFence, FenceError> {
        if index >= self.fences.len() {
            return Err(FenceError::NoSuchFence(index));
        }
        match self.editing() {
            Some(i) if i == index => self.staged = None,
            Some(i) if i > index => {
                if let Some((staged, _)) = self.staged.as_mut() {
                    *staged -= 1;
                }
            }
            _ => {}
        }
        Ok(self.fences.remove(index))
    }

    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<(), FenceError> {
        let fence = self
            .fences
            .get_mut(index)
            .ok_or(FenceError::NoSuchFence(index))?;
        fence.enabled = enabled;
        Ok(())
    }

    /// Flush the staged buffer into its fence and save the camera list.
    ///
    /// Fences with fewer than three points are saved as they are.
    pub async fn commit(&mut self, config: &ConfigReconciler) -> Result<SaveOutcome, FenceError> {
        if let Some((index, buf)) = self.staged.take() {
            if let Some(fence) = self.fences.get_mut(index) {
                fence.points = buf;
            }
        }

        let fences = self.fences.clone();
        let outcome = config
            .edit_camera(&self.camera_id, move |cam| {
                cam.virtual_fences = Some(fences);
            })
            .await
            .ok_or_else(|| FenceError::UnknownCamera(self.camera_id.clone()))?;

        info!(
            camera = %self.camera_id,
            fences = self.fences.len(),
            "Committed virtual fences"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::default_cameras;
    use crate::config::MemoryLocalStore;
    use std::sync::Arc;

    fn square() -> VirtualFence {
        VirtualFence {
            name: "zone".into(),
            points: vec![
                FencePoint::new(0.2, 0.2),
                FencePoint::new(0.8, 0.2),
                FencePoint::new(0.8, 0.8),
                FencePoint::new(0.2, 0.8),
            ],
            enabled: true,
            detect_objects: vec!["person".into()],
        }
    }

    #[test]
    fn contains_inside_and_outside() {
        let fence = square();
        assert!(fence.contains(FencePoint::new(0.5, 0.5)));
        assert!(!fence.contains(FencePoint::new(0.1, 0.5)));
        assert!(!fence.contains(FencePoint::new(0.5, 0.95)));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let mut fence = square();
        fence.points.truncate(2);
        assert!(!fence.contains(FencePoint::new(0.5, 0.2)));
    }

    #[test]
    fn triggers_respects_class_and_enabled() {
        let mut fence = square();
        let center = FencePoint::new(0.5, 0.5);
        assert!(fence.triggers("Person", center));
        assert!(!fence.triggers("car", center));
        fence.enabled = false;
        assert!(!fence.triggers("person", center));
    }

    #[test]
    fn drags_stay_staged_until_commit() {
        let cam = &default_cameras()[0];
        let mut editor = FenceEditor::new(cam);

        assert_eq!(editor.drag_point(0, FencePoint::new(0.1, 0.1)), Err(FenceError::NotEditing));

        editor.begin_edit(0).unwrap();
        editor.drag_point(0, FencePoint::new(1.4, -0.2)).unwrap();

        assert_eq!(editor.points(0).unwrap()[0], FencePoint::new(1.0, 0.0));
        assert_eq!(editor.fences()[0].points[0], FencePoint::new(0.2, 0.3));
        assert_eq!(
            editor.drag_point(9, FencePoint::new(0.5, 0.5)),
            Err(FenceError::NoSuchPoint(9))
        );

        editor.cancel();
        assert_eq!(editor.points(0).unwrap()[0], FencePoint::new(0.2, 0.3));
    }

    #[test]
    fn remove_point_edits_buffer_only() {
        let mut cam = default_cameras()[0].clone();
        cam.virtual_fences = Some(vec![square()]);
        let mut editor = FenceEditor::new(&cam);

        editor.begin_edit(0).unwrap();
        assert_eq!(editor.remove_point(1), Ok(FencePoint::new(0.8, 0.2)));
        assert_eq!(editor.points(0).unwrap().len(), 3);
        assert_eq!(editor.fences()[0].points.len(), 4);
        assert_eq!(editor.remove_point(3), Err(FenceError::NoSuchPoint(3)));
    }

    #[test]
    fn remove_fence_shifts_staged_index() {
        let mut cam = default_cameras()[0].clone();
        cam.virtual_fences = Some(vec![square(), square()]);
        let mut editor = FenceEditor::new(&cam);

        editor.begin_edit(1).unwrap();
        editor.remove_fence(0).unwrap();
        assert_eq!(editor.editing(), Some(0));
        assert_eq!(editor.remove_fence(5), Err(FenceError::NoSuchFence(5)));
    }

    #[tokio::test]
    async fn commit_flushes_buffer_into_config() {
        let config = ConfigReconciler::new(None, Arc::new(MemoryLocalStore::new()));
        config.load().await;

        let cam = config.cameras().await[3].clone();
        let mut editor = FenceEditor::new(&cam);
        let index = editor.add_fence("Porch", vec!["package".into()]);
        editor.add_point(FencePoint::new(0.1, 0.1)).unwrap();
        editor.add_point(FencePoint::new(0.9, 0.1)).unwrap();

        let before = config.cameras().await;
        assert!(before[3].virtual_fences.is_none(), "nothing saved before commit");

        editor.commit(&config).await.unwrap();
        assert_eq!(editor.editing(), None);

        let saved = config.cameras().await;
        let fences = saved[3].virtual_fences.as_ref().unwrap();
        assert_eq!(fences[index].name, "Porch");
        assert_eq!(fences[index].points.len(), 2, "degenerate polygons are accepted");
    }

    #[tokio::test]
    async fn commit_for_removed_camera_fails() {
        let config = ConfigReconciler::new(None, Arc::new(MemoryLocalStore::new()));
        config.load().await;
        let cam = config.cameras().await[0].clone();
        config.remove_camera(&cam.id).await.unwrap();

        let mut editor = FenceEditor::new(&cam);
        assert_eq!(
            editor.commit(&config).await,
            Err(FenceError::UnknownCamera("cam1".into()))
        );
    }
}
