use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::BackendError;

/// Collects errors wgpu reports outside of a `Result`, in place of wgpu's
/// default handler, which panics.
#[derive(Clone, Default)]
pub(super) struct DeviceErrors {
    pending: Arc<Mutex<Vec<BackendError>>>,
}

impl DeviceErrors {
    pub fn install(&self, device: &wgpu::Device) {
        let pending = self.pending.clone();
        device.on_uncaptured_error(Arc::new(move |error: wgpu::Error| {
            pending.lock().push(backend_error(&error));
        }));
    }

    /// Folds reported errors into `result`: the first one wins, the rest are logged.
    pub fn check<E>(&self, result: Result<(), E>) -> Result<(), E>
    where
        E: From<BackendError> + std::fmt::Display,
    {
        let reported: Vec<BackendError> = std::mem::take(&mut *self.pending.lock());
        let mut first = result.err();
        for error in reported {
            if first.is_none() {
                first = Some(E::from(error));
            } else {
                log::error!("wgpu: {error}");
            }
        }

        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    fn report(&self, error: BackendError) {
        self.pending.lock().push(error);
    }
}

fn backend_error(error: &wgpu::Error) -> BackendError {
    match error {
        wgpu::Error::OutOfMemory { .. } => BackendError::OutOfMemory,
        other => BackendError::Failed(format!("device error: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::PresentError;

    #[test]
    fn nothing_reported_keeps_the_result() {
        let errors = DeviceErrors::default();
        assert_eq!(errors.check::<BackendError>(Ok(())), Ok(()));
        assert_eq!(
            errors.check(Err(BackendError::SurfaceLost)),
            Err(BackendError::SurfaceLost)
        );
    }

    #[test]
    fn reported_error_fails_a_successful_call_once() {
        let errors = DeviceErrors::default();
        errors.report(BackendError::Failed("bad bind group".to_string()));
        errors.report(BackendError::OutOfMemory);

        assert_eq!(
            errors.check::<BackendError>(Ok(())),
            Err(BackendError::Failed("bad bind group".to_string()))
        );
        assert_eq!(errors.check::<BackendError>(Ok(())), Ok(()));
    }

    #[test]
    fn call_error_takes_precedence() {
        let errors = DeviceErrors::default();
        errors.report(BackendError::OutOfMemory);

        assert_eq!(
            errors.check(Err(PresentError::NoContext)),
            Err(PresentError::NoContext)
        );
    }
}
