//! Scoped ownership of freshly created kernel handles.

use super::{BodyHandle, FeedbackHandle, GeomHandle, JointHandle, Kernel, TriMeshHandle};

/// A kernel handle that knows its destroy primitive.
pub trait KernelResource: Copy {
    fn release<K: Kernel + ?Sized>(self, kernel: &mut K);
}

impl KernelResource for BodyHandle {
    fn release<K: Kernel + ?Sized>(self, kernel: &mut K) {
        kernel.body_destroy(self);
    }
}

impl KernelResource for GeomHandle {
    fn release<K: Kernel + ?Sized>(self, kernel: &mut K) {
        kernel.geom_destroy(self);
    }
}

impl KernelResource for JointHandle {
    fn release<K: Kernel + ?Sized>(self, kernel: &mut K) {
        kernel.joint_destroy(self);
    }
}

impl KernelResource for FeedbackHandle {
    fn release<K: Kernel + ?Sized>(self, kernel: &mut K) {
        kernel.feedback_destroy(self);
    }
}

impl KernelResource for TriMeshHandle {
    fn release<K: Kernel + ?Sized>(self, kernel: &mut K) {
        kernel.trimesh_destroy(self);
    }
}

/// Guard releasing a handle on drop unless [`Scoped::commit`] is called.
///
/// The guard borrows the kernel, so configuration calls go through
/// [`Scoped::kernel`] while the handle is still owned by the scope.
pub struct Scoped<'k, K: Kernel + ?Sized, H: KernelResource> {
    kernel: &'k mut K,
    handle: H,
    committed: bool,
}

impl<'k, K: Kernel + ?Sized, H: KernelResource> Scoped<'k, K, H> {
    pub fn new(kernel: &'k mut K, create: impl FnOnce(&mut K) -> H) -> Self {
        let handle = create(&mut *kernel);
        Self {
            kernel,
            handle,
            committed: false,
        }
    }

    pub fn handle(&self) -> H {
        self.handle
    }

    pub fn kernel(&mut self) -> &mut K {
        &mut *self.kernel
    }

    /// Hands ownership of the handle back to the caller.
    pub fn commit(mut self) -> H {
        self.committed = true;
        self.handle
    }
}

impl<'k, K: Kernel + ?Sized, H: KernelResource> Drop for Scoped<'k, K, H> {
    fn drop(&mut self) {
        if !self.committed {
            self.handle.release(&mut *self.kernel);
        }
    }
}
