//! Export of the result store to hdf5
use super::store::ResultStore;
use crate::error::Result;
use hdf5::H5Type;
use ndarray::{ArrayBase, Data, Dimension};
use std::path::{Path, PathBuf};

fn write_dataset<T, S, D>(file: &hdf5::File, name: &str, array: &ArrayBase<S, D>) -> hdf5::Result<()>
where
    T: H5Type + Copy,
    S: Data<Elem = T>,
    D: Dimension,
{
    let dset = file
        .new_dataset::<T>()
        .no_chunk()
        .shape(array.shape())
        .create(name)?;
    dset.write(&array.view())?;
    Ok(())
}

/// Write mesh and samples to `{step:06}.h5` in `dir`
pub fn write_h5<P: AsRef<Path>>(dir: P, step: usize, store: &ResultStore) -> Result<PathBuf> {
    let path = dir.as_ref().join(format!("{:06}.h5", step));
    let file = hdf5::File::create(&path)?;
    let (x, y) = store.coordinates();
    write_dataset(&file, "x", x)?;
    write_dataset(&file, "y", y)?;
    let triangles = store.triangles().mapv(|i| i as u64);
    write_dataset(&file, "t", &triangles)?;
    write_dataset(&file, "u", &store.u())?;
    write_dataset(&file, "v", &store.v())?;
    write_dataset(&file, "p", &store.p())?;
    Ok(path)
}
